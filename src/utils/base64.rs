use base64::{engine::general_purpose, Engine as _};

/// Encodes a string to padded standard Base64.
pub fn base64_encode(input: &str) -> String {
    general_purpose::STANDARD.encode(input)
}

/// Encodes a string to URL-safe Base64 without padding.
pub fn url_safe_base64_encode(input: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(input)
}

/// Reverses a URL-safe Base64 string to the standard alphabet and restores padding.
pub fn url_safe_base64_reverse(input: &str) -> String {
    let mut s: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let trimmed_len = s.trim_end_matches('=').len();
    s.truncate(trimmed_len);
    while s.len() % 4 != 0 {
        s.push('=');
    }
    s
}

/// Decodes standard or URL-safe Base64, padded or not.
///
/// # Arguments
/// * `input` - Base64 text, whitespace is ignored
///
/// # Returns
/// * `Some(String)` when the input is valid Base64 of UTF-8 text
/// * `None` otherwise
pub fn try_base64_decode(input: &str) -> Option<String> {
    let normalized = url_safe_base64_reverse(input);
    if normalized.is_empty() {
        return None;
    }
    let bytes = general_purpose::STANDARD
        .decode(&normalized)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(normalized.trim_end_matches('=')))
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Decodes a URL-safe Base64 string, returning the input unchanged when it is not Base64.
pub fn url_safe_base64_decode(input: &str) -> String {
    try_base64_decode(input).unwrap_or_else(|| input.to_string())
}
