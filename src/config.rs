//! # config
//!
//! Each analysis is configured by an id and a set of options written as
//! `key:value;key:value`, e.g. `solver:iterative` or `entry:<Main: void main()>`.
//! Values may contain `:` themselves, only the first one separates the key.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AnalysisError, Result};

static OPTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z][\w-]*)\s*:\s*(.*?)\s*$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    options: BTreeMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key:value;key:value`. Empty segments are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut options = BTreeMap::new();
        for segment in text.split(';') {
            if segment.trim().is_empty() {
                continue;
            }
            let caps = OPTION_REGEX
                .captures(segment)
                .ok_or_else(|| AnalysisError::MalformedOption(segment.trim().to_string()))?;
            options.insert(caps[1].to_string(), caps[2].to_string());
        }
        Ok(Self { options })
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.options.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(value) => Err(AnalysisError::InvalidOptionValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .options
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect();
        write!(f, "{}", parts.join(";"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub id: String,
    pub options: Options,
}

impl AnalysisConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            options: Options::new(),
        }
    }

    pub fn with_options(id: &str, options: &str) -> Result<Self> {
        Ok(Self {
            id: id.to_string(),
            options: Options::parse(options)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_parse_options() {
        let options =
            Options::parse("solver:iterative; entry:<Main: void main(java.lang.String[])>")
                .unwrap();
        assert_eq!(options.get("solver"), Some("iterative"));
        assert_eq!(
            options.get("entry"),
            Some("<Main: void main(java.lang.String[])>")
        );
        assert_eq!(options.get_str("missing", "worklist"), "worklist");
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert_eq!(Options::parse("").unwrap(), Options::new());
        assert_eq!(Options::parse(";;").unwrap(), Options::new());
        assert!(matches!(
            Options::parse("no-colon-here"),
            Err(AnalysisError::MalformedOption(_))
        ));
    }

    #[test]
    fn test_get_bool() {
        let options = Options::parse("dump:true;quiet:maybe").unwrap();
        assert_eq!(options.get_bool("dump", false), Ok(true));
        assert_eq!(options.get_bool("absent", true), Ok(true));
        assert!(options.get_bool("quiet", false).is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let config = AnalysisConfig::with_options("cipta", "entry:<A: void m()>").unwrap();
        assert_eq!(config.id, "cipta");
        assert_eq!(config.options.to_string(), "entry:<A: void m()>");
    }
}
