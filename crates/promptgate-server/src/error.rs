use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind server address: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}
