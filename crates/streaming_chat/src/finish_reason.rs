use crate::chat_completions::FinishReason;

pub const CONTENT_FILTERED_MARKER: &str = "WARNING: Content filtered!";
pub const TOKEN_LIMIT_MARKER: &str = "ERROR: Exceeded token limit!";

/// The diagnostic line appended for a curtailed response, if any.
pub fn suffix(finish_reason: FinishReason) -> Option<&'static str> {
    match finish_reason {
        FinishReason::ContentFiltered => Some(CONTENT_FILTERED_MARKER),
        FinishReason::TokenLimitReached => Some(TOKEN_LIMIT_MARKER),
        FinishReason::Stop | FinishReason::Other => None,
    }
}

/// Applies the finish reason to a turn's fully accumulated text.
///
/// Must be called once per turn on the final text, never per fragment.
pub fn apply_policy(mut text: String, finish_reason: Option<FinishReason>) -> String {
    if let Some(marker) = finish_reason.and_then(suffix) {
        text.push('\n');
        text.push_str(marker);
    }
    text
}
