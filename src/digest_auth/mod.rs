//! DigestAuth - HTTP Digest Authentication client
//!
//! ## Responsibilities
//!
//! - Probe a camera endpoint without credentials
//! - Parse the `WWW-Authenticate` Digest challenge
//! - Re-issue the request once with an RFC 2617 `Authorization` header
//!
//! ## Design
//!
//! - Per-call handshake: `nc` is always `00000001` and a fresh `cnonce` is drawn
//! - No shared auth state between calls
//! - Non-2xx responses are returned to the caller, never retried

mod challenge;
mod client;
mod types;

pub use challenge::{parse_auth_params, DigestChallenge, DigestResponse, NONCE_COUNT};
pub use client::{CnonceSource, DigestAuthClient, DigestRequest};
pub use types::*;
