use thiserror::Error;

/// Failure to decode a link or a subscription document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid base64 payload")]
    InvalidBase64,
    #[error("malformed {0} descriptor")]
    Malformed(&'static str),
    #[error("invalid port `{0}`")]
    InvalidPort(String),
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("unsupported scheme in `{0}`")]
    UnsupportedScheme(String),
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("invalid YAML: {0}")]
    Yaml(String),
    #[error("no proxies found")]
    Empty,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        ParseError::Yaml(err.to_string())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a port number, rejecting zero and anything outside `u16`.
pub fn parse_port(port: &str) -> ParseResult<u16> {
    match port.trim().parse::<u16>() {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(ParseError::InvalidPort(port.to_string())),
    }
}

/// Rejects an empty server name
pub fn require_server(server: &str) -> ParseResult<&str> {
    let server = server.trim();
    if server.is_empty() {
        Err(ParseError::MissingField("server".to_string()))
    } else {
        Ok(server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("443"), Ok(443));
        assert_eq!(parse_port(" 8388 "), Ok(8388));
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536").is_err());
        assert!(parse_port("abc").is_err());
    }
}
