//! Method signatures in their textual form.
//!
//! A subsignature identifies a method inside a class: `ret name(p1,p2)`.
//! A full signature also names the declaring class: `<Class: ret name(p1,p2)>`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ClassId;
use crate::error::{AnalysisError, Result};

static SIGNATURE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<\s*([\w.$\[\]]+)\s*:\s*([\w.$\[\]]+)\s+([\w$<>]+)\s*\(([^()]*)\)\s*>$").unwrap()
});

static SUBSIGNATURE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w.$\[\]]+)\s+([\w$<>]+)\s*\(([^()]*)\)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subsignature(String);

impl Subsignature {
    pub fn new(ret: &str, name: &str, params: &[&str]) -> Self {
        Subsignature(format!("{} {}({})", ret, name, params.join(",")))
    }

    /// Normalizes whitespace so `void m( int, int )` and `void m(int,int)` agree.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = SUBSIGNATURE_REGEX
            .captures(text.trim())
            .ok_or_else(|| AnalysisError::MalformedSignature(text.to_string()))?;
        let params = split_params(&caps[3]);
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        Ok(Subsignature::new(&caps[1], &caps[2], &params))
    }

    pub fn name(&self) -> &str {
        let open = self.0.find('(').unwrap_or(self.0.len());
        let start = self.0[..open].rfind(' ').map(|i| i + 1).unwrap_or(0);
        &self.0[start..open]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subsignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Splits `<Class: ret name(params)>` into the class name and the subsignature.
pub fn parse_signature(text: &str) -> Result<(String, Subsignature)> {
    let caps = SIGNATURE_REGEX
        .captures(text.trim())
        .ok_or_else(|| AnalysisError::MalformedSignature(text.to_string()))?;
    let params = split_params(&caps[4]);
    let params: Vec<&str> = params.iter().map(String::as_str).collect();
    Ok((
        caps[1].to_string(),
        Subsignature::new(&caps[2], &caps[3], &params),
    ))
}

fn split_params(params: &str) -> Vec<String> {
    params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reference to a method as written at a call site: the declared class and the
/// subsignature. Resolution against the hierarchy happens later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub class: ClassId,
    pub subsignature: Subsignature,
}

impl MethodRef {
    pub fn new(class: ClassId, subsignature: Subsignature) -> Self {
        Self {
            class,
            subsignature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsignature() {
        let sub = Subsignature::new("void", "foo", &["int", "java.lang.String"]);
        assert_eq!(sub.as_str(), "void foo(int,java.lang.String)");
        assert_eq!(sub.name(), "foo");
        assert_eq!(Subsignature::parse("void foo( int , java.lang.String )").unwrap(), sub);
        assert_eq!(Subsignature::new("void", "<init>", &[]).name(), "<init>");
    }

    #[test]
    fn test_parse_signature() {
        let (class, sub) = parse_signature("<Main: void main(java.lang.String[])>").unwrap();
        assert_eq!(class, "Main");
        assert_eq!(sub.as_str(), "void main(java.lang.String[])");

        let (class, sub) = parse_signature("<a.b.C: int get()>").unwrap();
        assert_eq!(class, "a.b.C");
        assert_eq!(sub.name(), "get");
    }

    #[test]
    fn test_malformed_signature() {
        assert!(parse_signature("Main.main()").is_err());
        assert!(parse_signature("<Main: main()>").is_err());
        assert!(Subsignature::parse("foo").is_err());
    }
}
