//! Handler error type.

/// Errors a route handler can return instead of a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// The request was understood but is not acceptable. The message is sent
    /// to the caller.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}
