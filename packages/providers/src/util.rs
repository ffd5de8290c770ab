//! Small helpers shared by the provider implementations

/// Maximum error body size kept in error messages
const MAX_ERROR_BODY_SIZE: usize = 1000;

/// Truncate an error body on a UTF-8 boundary
pub(crate) fn truncate_error_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_SIZE {
        return body;
    }
    let truncate_at = body
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= MAX_ERROR_BODY_SIZE)
        .last()
        .unwrap_or(0);
    format!("{}... (truncated)", &body[..truncate_at])
}

/// Rough token count for cost estimation when the API reports none
///
/// Roughly four characters per token across the models in use.
pub(crate) fn estimate_tokens(text: &str) -> u32 {
    (text.len() / 4) as u32
}
