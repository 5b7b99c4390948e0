//! Ordered pattern rules shared by every tool.
//!
//! Three shapes cover everything the tools need:
//!
//! * [`TriggerPatterns`]: "does any rule match?" (used by `can_handle`),
//! * [`RuleSet`]: "which value does the first matching rule map to?"
//!   (sub-action selection),
//! * [`CaptureRules`]: "what does the first matching rule capture?"
//!   (parameter extraction with ordered fallbacks).
//!
//! Patterns are compiled once, inside `Lazy` statics owned by each tool.

use regex::{Regex, RegexBuilder};

fn compile(source: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(source)
        .case_insensitive(case_insensitive)
        .build()
        .unwrap_or_else(|e| panic!("invalid tool pattern {source:?}: {e}"))
}

/// A tool's trigger vocabulary.
///
/// Matching lowercases the query and succeeds if any pattern matches
/// anywhere in it.  Pure and deterministic.
#[derive(Debug)]
pub struct TriggerPatterns {
    patterns: Vec<Regex>,
}

impl TriggerPatterns {
    /// # Panics
    ///
    /// Panics if a pattern does not compile.  Patterns are literals in
    /// the tool modules, so this fires on first use in tests.
    pub fn new(sources: &[&str]) -> Self {
        Self {
            patterns: sources.iter().map(|s| compile(s, false)).collect(),
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        self.patterns.iter().any(|p| p.is_match(&lowered))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Ordered `(pattern, value)` rules; the first matching pattern wins.
#[derive(Debug)]
pub struct RuleSet<T> {
    rules: Vec<(Regex, T)>,
}

impl<T: Copy> RuleSet<T> {
    /// Build a case-insensitive rule set.
    pub fn new(rules: &[(&str, T)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(src, value)| (compile(src, true), *value))
                .collect(),
        }
    }

    pub fn first(&self, text: &str) -> Option<T> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, value)| *value)
    }
}

/// Ordered `(pattern, capture group)` rules for parameter extraction.
///
/// The first pattern that matches decides the result, even if its
/// capture group turns out to be empty.  Captured text keeps the
/// caller's original casing.
#[derive(Debug)]
pub struct CaptureRules {
    rules: Vec<(Regex, usize)>,
}

impl CaptureRules {
    /// Build a case-insensitive capture rule list.
    pub fn new(rules: &[(&str, usize)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(src, group)| (compile(src, true), *group))
                .collect(),
        }
    }

    pub fn first_capture(&self, text: &str) -> Option<String> {
        let (re, group) = self.rules.iter().find(|(re, _)| re.is_match(text))?;
        re.captures(text)
            .and_then(|caps| caps.get(*group))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_match_case_insensitively() {
        let t = TriggerPatterns::new(&[r"look\s+up\s+(.+)"]);
        assert!(t.matches("Please LOOK UP the weather"));
        assert!(!t.matches("lookup"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn empty_triggers_never_match() {
        let t = TriggerPatterns::new(&[]);
        assert!(t.is_empty());
        assert!(!t.matches("anything"));
    }

    #[test]
    fn rule_set_first_match_wins() {
        let rules = RuleSet::new(&[(r"image", 1), (r"news", 2), (r"image|news", 3)]);
        assert_eq!(rules.first("news and images"), Some(1));
        assert_eq!(rules.first("NEWS"), Some(2));
        assert_eq!(rules.first("weather"), None);
    }

    #[test]
    fn capture_rules_keep_original_case() {
        let rules = CaptureRules::new(&[(r"for\s+user\s+([\w-]+)", 1), (r"user\s+([\w-]+)", 1)]);
        assert_eq!(
            rules.first_capture("repos FOR USER OctoCat please").as_deref(),
            Some("OctoCat")
        );
        assert_eq!(rules.first_capture("user rust-lang").as_deref(), Some("rust-lang"));
        assert_eq!(rules.first_capture("nobody here"), None);
    }

    #[test]
    fn capture_rules_stop_at_first_matching_pattern() {
        let rules = CaptureRules::new(&[(r"search\s+for\s+(.+)", 1), (r"search\s+(.+)", 1)]);
        assert_eq!(
            rules.first_capture("search for rust").as_deref(),
            Some("rust")
        );
    }
}
