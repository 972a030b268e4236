//! Wire types for the gateway HTTP surface

use serde::{Deserialize, Serialize};

/// Form body for POST /v1/chat/completions
#[derive(Debug, Deserialize)]
pub struct ChatCompletionForm {
    pub provider: String,
    pub model: String,
    pub prompt: String,
}

/// Form body for POST /admin/add_regex
#[derive(Debug, Deserialize)]
pub struct AddPromptRuleForm {
    pub original_model: String,
    pub regex_pattern: String,
    pub redirect_model: String,
}

/// Form body for POST /admin/add_file_routing
#[derive(Debug, Deserialize)]
pub struct AddFileRuleForm {
    pub file_type: String,
    pub redirect_provider: String,
    pub redirect_model: String,
}

/// JSON acknowledgement for POST /upload/
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub response: String,
}
