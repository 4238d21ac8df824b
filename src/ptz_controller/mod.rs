//! PTZ Controller Module
//!
//! Pan/tilt/zoom and reboot control of cameras over Digest-authenticated CGI

pub mod service;
pub mod types;

pub use service::PtzService;
pub use types::*;
