//! Tagged defect-code patterns.
//!
//! Rule authors write textual patterns (`^(FC|FL)$`, `.*`, `^J`). Anchored
//! literal alternations become [`CodePattern::Exact`] / [`CodePattern::AnyOf`];
//! anything else is compiled as a case-insensitive regex.

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
pub enum CodePattern {
    /// Matches every code
    Any,
    Exact(String),
    AnyOf(Vec<String>),
    Regex(Regex),
}

impl CodePattern {
    /// Parse a textual pattern. Returns the regex error text on failure.
    pub fn parse(text: &str) -> Result<CodePattern, String> {
        let trimmed = text.trim();
        if matches!(trimmed, "" | ".*" | "^.*$" | ".+" | "^.+$" | "*") {
            return Ok(CodePattern::Any);
        }

        if let Some(codes) = anchored_literals(trimmed) {
            return Ok(match codes.len() {
                1 => CodePattern::Exact(codes[0].clone()),
                _ => CodePattern::AnyOf(codes),
            });
        }

        RegexBuilder::new(trimmed)
            .case_insensitive(true)
            .build()
            .map(CodePattern::Regex)
            .map_err(|e| e.to_string())
    }

    /// Build a set pattern from explicit codes.
    pub fn from_codes(codes: &[String]) -> CodePattern {
        let mut upper: Vec<String> = codes.iter().map(|c| c.trim().to_uppercase()).collect();
        upper.retain(|c| !c.is_empty());
        match upper.len() {
            0 => CodePattern::Any,
            1 => CodePattern::Exact(upper.remove(0)),
            _ => CodePattern::AnyOf(upper),
        }
    }

    pub fn matches(&self, code: &str) -> bool {
        let code = code.trim();
        match self {
            CodePattern::Any => true,
            CodePattern::Exact(expected) => expected.eq_ignore_ascii_case(code),
            CodePattern::AnyOf(codes) => codes.iter().any(|c| c.eq_ignore_ascii_case(code)),
            CodePattern::Regex(re) => re.is_match(code),
        }
    }
}

/// `^CODE$`, `^(A|B|C)$` or `^(?:A|B)$` with purely alphanumeric alternatives.
fn anchored_literals(text: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix('^')?.strip_suffix('$')?;
    let inner = inner
        .strip_prefix("(?:")
        .or_else(|| inner.strip_prefix('('))
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(inner);

    let codes: Vec<String> = inner.split('|').map(|c| c.trim().to_uppercase()).collect();
    let literal = codes
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_alphanumeric()));
    literal.then_some(codes)
}
