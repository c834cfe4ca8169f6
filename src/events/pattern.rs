//! Glob matching of host event names.
//!
//! Patterns use shell-style globs (`*`, `?`, `[..]`); `*` also spans `:`,
//! so `tool:*` matches `tool:pre` and `*` matches everything. A pattern that
//! fails to compile as a glob only matches its literal text.

use glob::Pattern;

/// A compiled event-name pattern.
#[derive(Debug, Clone)]
pub struct EventPattern {
    raw: String,
    compiled: Option<Pattern>,
}

impl EventPattern {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let compiled = match Pattern::new(&raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                tracing::warn!(pattern = %raw, error = %err, "Invalid event pattern, matching literally");
                None
            }
        };
        Self { raw, compiled }
    }

    pub fn matches(&self, event_name: &str) -> bool {
        match &self.compiled {
            Some(pattern) => pattern.matches(event_name),
            None => self.raw == event_name,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Ordered set of patterns; an event passes if any pattern matches.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<EventPattern>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(EventPattern::new).collect(),
        }
    }

    pub fn matches(&self, event_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(event_name))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Registration-ordered `(pattern, entry)` pairs.
///
/// Matching returns a snapshot, so callers can iterate while the list is
/// mutated (e.g. by a handler unregistering itself).
#[derive(Debug)]
pub struct PatternList<T> {
    entries: Vec<(EventPattern, T)>,
}

impl<T> Default for PatternList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> PatternList<T> {
    pub fn push(&mut self, pattern: &str, entry: T) {
        self.entries.push((EventPattern::new(pattern), entry));
    }

    /// Remove every entry registered under `pattern` for which `is_target` holds.
    ///
    /// Returns the number of entries removed.
    pub fn remove_where(&mut self, pattern: &str, is_target: impl Fn(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|(p, entry)| !(p.as_str() == pattern && is_target(entry)));
        before - self.entries.len()
    }

    /// Entries whose pattern matches `event_name`, in registration order.
    pub fn matching(&self, event_name: &str) -> Vec<T> {
        self.entries
            .iter()
            .filter(|(p, _)| p.matches(event_name))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
