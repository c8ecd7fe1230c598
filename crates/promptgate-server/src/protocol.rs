use serde::{Deserialize, Serialize};

/// Body of `POST /prompt_edit/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub session_id: String,
    pub edited_text: String,
}

/// Body of `POST /prompt_edit/confirm`.
///
/// Editors usually send the final text along with the confirm so a missed
/// update cannot resolve the session with stale text.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub session_id: String,
    #[serde(default)]
    pub edited_text: Option<String>,
}

/// Body of `POST /prompt_edit/cancel`.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub session_id: String,
}

/// Response envelope shared by all control endpoints.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ControlResponse {
    Success,
    Error { message: String },
}
