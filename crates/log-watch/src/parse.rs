//! Access-log line filtering and URL extraction.
//!
//! The SWAG access-log format carries the full request URL as a
//! whitespace-delimited token of each line. The watcher takes the
//! first token starting with `http` as the accessed URL and ignores
//! redirect responses entirely: a 302 means the proxy bounced the
//! client (usually to an auth portal), not that the app was used.

/// Marker identifying a redirect response line.
///
/// The status code sits directly after the closing quote of the
/// request field, so this substring only matches the status position.
pub const REDIRECT_MARKER: &str = "\" 302 ";

/// Scheme prefix identifying a URL token.
const URL_PREFIX: &str = "http";

/// Extract the accessed URL from one access-log line.
///
/// Returns `None` for redirect lines and for lines carrying no URL
/// token. Only the first URL token is taken.
pub fn extract_url(line: &str) -> Option<&str> {
    if line.contains(REDIRECT_MARKER) {
        return None;
    }
    line.split_whitespace()
        .find(|token| token.starts_with(URL_PREFIX))
}
