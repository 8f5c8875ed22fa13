//! String patterns for matching URL components.

/// Type of URL pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternType {
    /// Exact match.
    Exact,
    /// Prefix match.
    Prefix,
    /// Contains substring.
    Contains,
}

/// A case-sensitive pattern over a URL component (usually the path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    /// Pattern type.
    pub pattern_type: PatternType,
    /// Pattern string.
    pub pattern: String,
}

impl UrlPattern {
    /// Create an exact match pattern.
    pub fn exact(value: &str) -> Self {
        Self {
            pattern_type: PatternType::Exact,
            pattern: value.to_string(),
        }
    }

    /// Create a prefix match pattern.
    pub fn prefix(prefix: &str) -> Self {
        Self {
            pattern_type: PatternType::Prefix,
            pattern: prefix.to_string(),
        }
    }

    /// Create a contains pattern.
    pub fn contains(substring: &str) -> Self {
        Self {
            pattern_type: PatternType::Contains,
            pattern: substring.to_string(),
        }
    }

    /// Check if `input` matches this pattern.
    pub fn matches(&self, input: &str) -> bool {
        match self.pattern_type {
            PatternType::Exact => input == self.pattern,
            PatternType::Prefix => input.starts_with(&self.pattern),
            PatternType::Contains => input.contains(&self.pattern),
        }
    }
}

/// True if any pattern in `patterns` matches `input`.
pub fn any_match(patterns: &[UrlPattern], input: &str) -> bool {
    patterns.iter().any(|p| p.matches(input))
}
