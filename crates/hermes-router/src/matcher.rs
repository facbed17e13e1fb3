//! Generic pattern matcher with deterministic candidate ordering.

use std::collections::HashMap;

use crate::node::Node;
use crate::pattern::{path_segments, PathPattern};

/// One matched pattern, with its group bindings resolved to names.
#[derive(Debug)]
pub struct PatternMatch<'a, T> {
    /// The payload registered with the pattern.
    pub value: &'a T,
    /// The matched pattern.
    pub pattern: &'a PathPattern,
    /// Named capture → raw (undecoded) matched text.
    pub groups: HashMap<String, String>,
}

/// Matches request paths against a set of compiled patterns.
///
/// `insert` order is remembered: it is the final tie-break of the candidate
/// ordering, and the registry is immutable once the service starts, so
/// matching is lock-free.
///
/// # Example
///
/// ```rust
/// use hermes_router::{PathMatcher, PathPattern};
///
/// let mut matcher = PathMatcher::new();
/// matcher.insert(PathPattern::compile("/users/{id}").unwrap(), "byId");
/// matcher.insert(PathPattern::compile("/users/me").unwrap(), "me");
///
/// let matches = matcher.matches("/users/me");
/// assert_eq!(*matches[0].value, "me");
/// assert_eq!(*matches[1].value, "byId");
/// assert_eq!(matches[1].groups["id"], "me");
/// ```
#[derive(Debug, Default)]
pub struct PathMatcher<T> {
    entries: Vec<(PathPattern, T)>,
    root: Node,
}

impl<T> PathMatcher<T> {
    /// Creates an empty matcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            root: Node::default(),
        }
    }

    /// Registers a pattern with its payload.
    pub fn insert(&mut self, pattern: PathPattern, value: T) {
        let index = self.entries.len();
        self.root.insert(pattern.segments(), index);
        self.entries.push((pattern, value));
    }

    /// Number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no patterns are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collects every pattern matching `path`, in precedence order:
    /// more literal hits, then fewer captures, then glob-free, then
    /// registration order.
    #[must_use]
    pub fn matches(&self, path: &str) -> Vec<PatternMatch<'_, T>> {
        let segments = path_segments(path);
        let mut captured = Vec::new();
        let mut raw = Vec::new();
        self.root.collect(&segments, &mut captured, &mut raw);

        raw.sort_by_key(|m| {
            let pattern = &self.entries[m.index].0;
            (
                std::cmp::Reverse(pattern.literal_count()),
                pattern.capture_count(),
                pattern.has_glob(),
                m.index,
            )
        });

        raw.into_iter()
            .map(|m| {
                let (pattern, value) = &self.entries[m.index];
                let groups = pattern
                    .capture_names()
                    .map(String::from)
                    .zip(m.captured)
                    .collect();
                PatternMatch {
                    value,
                    pattern,
                    groups,
                }
            })
            .collect()
    }
}
