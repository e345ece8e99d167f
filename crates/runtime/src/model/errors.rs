use thiserror::Error;

/// Errors from model client calls.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The model service could not be reached or refused the request.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// The model replied with something that does not decode into a
    /// final answer or a tool request.
    #[error("malformed model response: {0}")]
    Malformed(String),
}
