//! URL encoding/decoding and query helpers

use linked_hash_map::LinkedHashMap;

/// Encodes a string using URL (percent) encoding
///
/// # Examples
/// ```
/// use subcodec::utils::url::url_encode;
///
/// let encoded = url_encode("Hello World!");
/// assert_eq!(encoded, "Hello%20World%21");
/// ```
pub fn url_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Decodes a URL-encoded string
///
/// # Returns
/// * The decoded string, or the original input if decoding fails
///
/// # Examples
/// ```
/// use subcodec::utils::url::url_decode;
///
/// let decoded = url_decode("Hello%20World%21");
/// assert_eq!(decoded, "Hello World!");
/// ```
pub fn url_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

/// Parses a query string into an ordered map.
///
/// Keys are kept in first-seen order; a repeated key keeps its first value.
/// `+` decodes to a space, as form encoding does.
pub fn parse_query(query: &str) -> LinkedHashMap<String, String> {
    let mut params = LinkedHashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        if !params.contains_key(key.as_ref()) {
            params.insert(key.into_owned(), value.into_owned());
        }
    }
    params
}

/// Gets a single argument from a query string, empty when absent
pub fn get_url_arg(query: &str, key: &str) -> String {
    parse_query(query).remove(key).unwrap_or_default()
}

/// Checks whether the string is an http(s) link
pub fn is_link(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Builds a query string from key-value pairs, skipping empty values.
pub fn build_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    pairs
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, url_encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}
