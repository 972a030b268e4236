//! Resolution outputs shared with the gateway surface

use serde::{Deserialize, Serialize};

/// Outcome of resolving a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResolution {
    /// Requested provider, passed through unchanged
    pub provider: String,
    /// Effective model after rule evaluation
    pub model: String,
    /// Canned response text for the effective model
    pub response: String,
}

/// Outcome of resolving an uploaded file by extension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResolution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub response: String,
}

impl FileResolution {
    /// True when a file rule selected a provider/model pair
    pub fn is_routed(&self) -> bool {
        self.provider.is_some()
    }
}
