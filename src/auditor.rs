//! Counts legacy directives left over after translation.

use crate::directive::openers;
use serde::{Deserialize, Serialize};

/// Longest excerpt of a leftover directive kept for reporting
const EXCERPT_LIMIT: usize = 80;

/// A legacy directive that survived translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Residual {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in characters)
    pub column: usize,
    /// Text from the opener to the end of its line
    pub excerpt: String,
}

impl Residual {
    pub fn new(line: usize, column: usize, excerpt: impl Into<String>) -> Self {
        Self {
            line,
            column,
            excerpt: excerpt.into(),
        }
    }
}

impl std::fmt::Display for Residual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.excerpt)
    }
}

impl PartialOrd for Residual {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Residual {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
            .then_with(|| self.excerpt.cmp(&other.excerpt))
    }
}

/// Locate every remaining legacy opener, in either delimiter variant.
///
/// Must only run on fully translated text: a half-rewritten document would
/// be miscounted.
pub fn audit(content: &str) -> Vec<Residual> {
    let mut residuals = Vec::new();
    let mut line = 1;
    let mut line_start = 0;
    let mut scanned = 0;

    for opener in openers(content) {
        for (offset, _) in content[scanned..opener.start].match_indices('\n') {
            line += 1;
            line_start = scanned + offset + 1;
        }
        scanned = opener.start;

        let column = content[line_start..opener.start].chars().count() + 1;
        let line_end = content[opener.start..]
            .find('\n')
            .map_or(content.len(), |i| opener.start + i);
        residuals.push(Residual::new(line, column, excerpt(&content[opener.start..line_end])));
    }

    residuals
}

/// Number of remaining legacy directives; zero means the document converted
pub fn count(content: &str) -> usize {
    openers(content).count()
}

fn excerpt(text: &str) -> String {
    let text = text.trim_end();
    if text.chars().count() <= EXCERPT_LIMIT {
        return text.to_string();
    }
    let truncated: String = text.chars().take(EXCERPT_LIMIT).collect();
    format!("{truncated}...")
}
