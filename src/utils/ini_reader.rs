//! Ordered INI reader
//!
//! Keeps sections and items in document order and allows repeated keys,
//! which both Surge-style proxy lists and list-valued settings rely on.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IniReaderError {
    #[error("empty document")]
    Empty,
    #[error("unterminated section header on line {0}")]
    BadSection(usize),
}

#[derive(Debug, Clone, Default)]
pub struct IniSection {
    pub name: String,
    /// Key-value pairs in document order. Lines without `=` are kept with an empty key.
    pub items: Vec<(String, String)>,
}

impl IniSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct IniReader {
    sections: Vec<IniSection>,
}

impl IniReader {
    /// Parse INI content.
    ///
    /// Items before the first section header land in a section named `""`.
    /// Comment lines start with `#`, `;` or `//`.
    pub fn parse(content: &str) -> Result<Self, IniReaderError> {
        if content.trim().is_empty() {
            return Err(IniReaderError::Empty);
        }

        let mut reader = IniReader::default();
        let mut current = IniSection::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with("//") {
                continue;
            }

            if line.starts_with('[') {
                let Some(end) = line.find(']') else {
                    return Err(IniReaderError::BadSection(idx + 1));
                };
                let finished = std::mem::replace(
                    &mut current,
                    IniSection {
                        name: line[1..end].trim().to_string(),
                        items: Vec::new(),
                    },
                );
                if !finished.name.is_empty() || !finished.items.is_empty() {
                    reader.sections.push(finished);
                }
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => current
                    .items
                    .push((key.trim().to_string(), value.trim().to_string())),
                None => current.items.push((String::new(), line.to_string())),
            }
        }
        if !current.name.is_empty() || !current.items.is_empty() {
            reader.sections.push(current);
        }

        Ok(reader)
    }

    /// Find a section by name, ignoring ASCII case
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn section_exist(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    pub fn get_all(&self, section: &str, key: &str) -> Vec<&str> {
        self.section(section)
            .map(|s| s.get_all(key))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_duplicates() {
        let ini = IniReader::parse(
            "[custom]\nruleset=A,a.list\n; comment\nruleset=B,b.list\n[Proxy]\nHK = ss, 1.1.1.1, 443\n",
        )
        .unwrap();
        assert_eq!(ini.section_names(), vec!["custom", "Proxy"]);
        assert_eq!(ini.get_all("custom", "ruleset"), vec!["A,a.list", "B,b.list"]);
        assert_eq!(ini.get("proxy", "HK"), Some("ss, 1.1.1.1, 443"));
    }

    #[test]
    fn test_parse_rejects_empty_and_broken_header() {
        assert_eq!(IniReader::parse("  \n").unwrap_err(), IniReaderError::Empty);
        assert_eq!(
            IniReader::parse("[Proxy\nx=y").unwrap_err(),
            IniReaderError::BadSection(1)
        );
    }
}
