//! HTTP control surface for the prompt edit broker.
//!
//! This crate exposes the editor-facing side of a broker: the
//! `/prompt_edit/update`, `/prompt_edit/confirm`, and `/prompt_edit/cancel`
//! control endpoints, a WebSocket feed of session lifecycle events, and a
//! health endpoint.

mod error;
mod protocol;
mod server;

pub use error::ServerError;
pub use protocol::{CancelRequest, ConfirmRequest, ControlResponse, UpdateRequest};
pub use server::PromptServer;
