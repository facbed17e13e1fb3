//! Compiled path templates.

use thiserror::Error;

/// Errors raised while compiling a path template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// `**` may only appear as the final segment.
    #[error("'**' must be the final segment in {template}")]
    GlobNotLast {
        /// The offending template.
        template: String,
    },

    /// A `{...}` capture with an empty or malformed name.
    #[error("Malformed capture segment {segment} in {template}")]
    MalformedCapture {
        /// The offending segment.
        segment: String,
        /// The offending template.
        template: String,
    },
}

/// One segment of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text; may be empty (doubled/trailing slash).
    Literal(String),
    /// Matches any single non-empty segment, binding it to the name.
    Capture(String),
    /// Matches the whole remaining path, including nothing. Terminal only.
    Glob,
}

/// A compiled representation of a URL template.
///
/// ```rust
/// use hermes_router::{PathPattern, Segment};
///
/// let pattern = PathPattern::compile("/apps/{app-id}/versions/**").unwrap();
/// assert_eq!(pattern.literal_count(), 2);
/// assert_eq!(pattern.capture_count(), 1);
/// assert!(pattern.has_glob());
/// assert_eq!(pattern.capture_names().collect::<Vec<_>>(), ["app-id"]);
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles a template into segments.
    ///
    /// # Errors
    ///
    /// Fails when `**` is not the final segment or a capture is malformed.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let parts = path_segments(template);
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            if *part == "**" {
                if i != last {
                    return Err(PatternError::GlobNotLast {
                        template: template.to_string(),
                    });
                }
                segments.push(Segment::Glob);
            } else if part.starts_with('{') && part.ends_with('}') && part.len() >= 2 {
                let name = &part[1..part.len() - 1];
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(PatternError::MalformedCapture {
                        segment: (*part).to_string(),
                        template: template.to_string(),
                    });
                }
                segments.push(Segment::Capture(name.to_string()));
            } else {
                segments.push(Segment::Literal((*part).to_string()));
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// The template text this pattern was compiled from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The compiled segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether the pattern ends in `**`.
    #[must_use]
    pub fn has_glob(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Glob))
    }

    /// Number of literal segments.
    #[must_use]
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Number of named captures.
    #[must_use]
    pub fn capture_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Capture(_)))
            .count()
    }

    /// The capture names, in path order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Splits a path into segments the way patterns are compiled.
///
/// One leading `/` is consumed; everything after it splits on `/` with no
/// filtering, so doubled and trailing slashes yield empty segments that
/// participate in matching as empty literals.
#[must_use]
pub fn path_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').collect()
}
