//! PTZ Controller type definitions

use serde::{Deserialize, Serialize};

/// PTZ move direction as seen in the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PtzDirection {
    Up,
    Down,
    Left,
    Right,
}

impl PtzDirection {
    /// Map a screen direction onto the camera for its mounting rotation.
    /// e.g. rotation=180: up -> down, left -> right
    pub fn apply_rotation(&self, rotation: i32) -> Self {
        let normalized = ((rotation % 360) + 360) % 360;
        match normalized {
            90 => match self {
                Self::Up => Self::Right,
                Self::Right => Self::Down,
                Self::Down => Self::Left,
                Self::Left => Self::Up,
            },
            180 => match self {
                Self::Up => Self::Down,
                Self::Down => Self::Up,
                Self::Left => Self::Right,
                Self::Right => Self::Left,
            },
            270 => match self {
                Self::Up => Self::Left,
                Self::Left => Self::Down,
                Self::Down => Self::Right,
                Self::Right => Self::Up,
            },
            _ => *self,
        }
    }

    /// VAPIX `move=` value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Unit pan/tilt vector (pan right positive, tilt up positive)
    pub fn vector(&self) -> (i32, i32) {
        match self {
            Self::Up => (0, 1),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

/// PTZ operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PtzMode {
    /// One step in the given direction
    #[default]
    Nudge,
    /// Move until a stop command
    Continuous,
}

/// PTZ move request
#[derive(Debug, Clone, Deserialize)]
pub struct PtzMoveRequest {
    pub direction: PtzDirection,
    #[serde(default)]
    pub mode: PtzMode,
    /// 0.0-1.0, continuous mode only
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    0.5
}

/// Relative zoom request
#[derive(Debug, Clone, Deserialize)]
pub struct PtzZoomRequest {
    /// Positive zooms in, negative zooms out
    pub step: i32,
}

/// Camera control result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtzResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PtzResponse {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
            message: None,
        }
    }

    pub fn success_with_message(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            error: None,
            message: Some(message.into()),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            message: None,
        }
    }
}
