//! Name-pattern matching for system files and folder exclusions.
//!
//! A pattern set is a pure function over `{exact-name set, glob set}`,
//! built once from config and matched case-insensitively, the way the
//! original tooling matched `.DS_Store`-style names.

use std::collections::HashSet;

use glob::Pattern;
use tracing::warn;

/// Compiled case-insensitive pattern set.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    exact: HashSet<String>,
    globs: Vec<Pattern>,
}

impl PatternSet {
    /// Compile patterns; entries containing `*` or `?` become globs, the
    /// rest are exact names. Invalid globs are dropped with a warning.
    pub fn compile(patterns: &[String]) -> Self {
        let mut exact = HashSet::new();
        let mut globs = Vec::new();
        for raw in patterns {
            let lowered = raw.to_lowercase();
            if lowered.contains('*') || lowered.contains('?') {
                match Pattern::new(&lowered) {
                    Ok(p) => globs.push(p),
                    Err(e) => warn!(pattern = %raw, error = %e, "Skipping invalid glob pattern"),
                }
            } else {
                exact.insert(lowered);
            }
        }
        Self { exact, globs }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.globs.is_empty()
    }

    /// Whether `name` (a bare file or folder name) matches any pattern.
    pub fn matches(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        if self.exact.contains(&lowered) {
            return true;
        }
        self.globs.iter().any(|p| p.matches(&lowered))
    }
}
