//! Regular-expression line selection
//!
//! Patterns are searched, not anchored: a line is kept when the pattern
//! matches anywhere in it. Callers that need exact matches anchor their
//! own patterns.

use regex::Regex;

/// Suffix appended in change-log mode to cover the `|size|changed_at` fields
pub const LOG_FIELDS_SUFFIX: &str = r"\|\d*\|.*";

/// What the corpus being filtered looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Change-log lines; the pattern targets only the path field
    ChangeLog,
    /// Plain names; the pattern is used verbatim
    Names,
}

/// Compiled line filter
#[derive(Debug, Clone)]
pub struct PatternFilter {
    pattern: String,
    regex: Regex,
    mode: FilterMode,
}

impl PatternFilter {
    pub fn new(pattern: &str, mode: FilterMode) -> Result<Self, regex::Error> {
        let effective = match mode {
            FilterMode::ChangeLog => format!("{}{}", pattern, LOG_FIELDS_SUFFIX),
            FilterMode::Names => pattern.to_string(),
        };
        let regex = Regex::new(&effective)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            mode,
        })
    }

    /// The pattern as supplied by the caller
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The expression actually matched against each line
    pub fn effective_pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Lines of `corpus` that match, in order
    ///
    /// Each call scans `corpus` afresh.
    pub fn filter_lines<'a>(&'a self, corpus: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        corpus
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(move |line| !line.is_empty() && self.regex.is_match(line))
    }

    /// Names that match, in order
    pub fn filter_names<'a, S: AsRef<str>>(
        &'a self,
        names: &'a [S],
    ) -> impl Iterator<Item = &'a str> + 'a {
        names
            .iter()
            .map(|name| name.as_ref())
            .filter(move |name| self.regex.is_match(name))
    }
}
