#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Terminal authentication failure: the call got a 401 and the one
    /// permitted refresh either failed or was not allowed.
    #[error("authentication required")]
    Unauthorized,

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
