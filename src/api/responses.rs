//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    schedule::{MoveDirection, Section},
    state::TimerSnapshot,
};

/// Body for adding or editing a section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionInput {
    pub name: String,
    /// Minutes
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub direction: MoveDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub from: usize,
    pub to: usize,
}

/// Encode request: the list to sign
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTokenRequest {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayQuery {
    pub token: Option<String>,
}

/// Response for every list and timer operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub sections: Vec<Section>,
    pub timer: TimerSnapshot,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, sections: Vec<Section>, timer: TimerSnapshot) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            sections,
            timer,
        }
    }

    /// A request that changed something
    pub fn applied(message: String, sections: Vec<Section>, timer: TimerSnapshot) -> Self {
        Self::new("applied".to_string(), message, sections, timer)
    }

    /// A request that was valid HTTP but left the state as it was
    pub fn unchanged(message: String, sections: Vec<Section>, timer: TimerSnapshot) -> Self {
        Self::new("unchanged".to_string(), message, sections, timer)
    }
}

/// Signed token and ready-to-share display link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Status response with timer and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub sections: Vec<Section>,
    pub timer: TimerSnapshot,
    pub share_enabled: bool,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
