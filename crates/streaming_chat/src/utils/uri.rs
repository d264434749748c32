/// Ensures URL ends without a trailing slash
///
/// # Examples
/// ```
/// use streaming_chat::utils::uri::ensure_no_trailing_slash;
/// assert_eq!(ensure_no_trailing_slash("https://resource.openai.azure.com/"), "https://resource.openai.azure.com");
///
/// // Works with owned String too
/// let url = String::from("http://localhost:11434/v1//");
/// assert_eq!(ensure_no_trailing_slash(url), "http://localhost:11434/v1");
/// ```
pub fn ensure_no_trailing_slash<S>(url: S) -> String
where
    S: Into<String>,
{
    let mut url = url.into();
    let trimmed = url.trim_end_matches('/').len();
    url.truncate(trimmed);
    url
}
