//! Trie node for compiled patterns.
//!
//! Each node is keyed by one path segment and carries two special edges
//! besides its literal children: at most one capture edge, shared by every
//! pattern with a capture at that position (capture *names* stay with the
//! pattern and are re-attached positionally after the walk), and a set of
//! glob terminals for patterns whose final `**` hangs off this node.

use crate::pattern::Segment;

/// A complete match produced by the trie walk: the pattern's registration
/// index plus the capture values in path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawMatch {
    pub index: usize,
    pub captured: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Node {
    /// Literal children, sorted by segment for binary search.
    literals: Vec<(String, Node)>,
    /// Capture child (at most one per node).
    capture: Option<Box<Node>>,
    /// Patterns terminating exactly at this node.
    terminals: Vec<usize>,
    /// Patterns whose terminal `**` consumes the remainder from this node.
    glob_terminals: Vec<usize>,
}

impl Node {
    /// Inserts a compiled pattern under this node.
    pub fn insert(&mut self, segments: &[Segment], index: usize) {
        let Some(segment) = segments.first() else {
            self.terminals.push(index);
            return;
        };
        let rest = &segments[1..];

        match segment {
            Segment::Literal(text) => {
                let child = match self
                    .literals
                    .binary_search_by(|(key, _)| key.as_str().cmp(text))
                {
                    Ok(i) => &mut self.literals[i].1,
                    Err(i) => {
                        self.literals.insert(i, (text.clone(), Node::default()));
                        &mut self.literals[i].1
                    }
                };
                child.insert(rest, index);
            }
            Segment::Capture(_) => {
                self.capture
                    .get_or_insert_with(Default::default)
                    .insert(rest, index);
            }
            Segment::Glob => {
                // Compilation guarantees the glob is terminal.
                self.glob_terminals.push(index);
            }
        }
    }

    /// Collects every pattern that completes against `segments`.
    ///
    /// Literal edges are tried before the capture edge so that capture
    /// values stack and unstack correctly, but precedence between completed
    /// candidates is decided by the caller, not by walk order.
    pub fn collect(&self, segments: &[&str], captured: &mut Vec<String>, out: &mut Vec<RawMatch>) {
        for &index in &self.glob_terminals {
            out.push(RawMatch {
                index,
                captured: captured.clone(),
            });
        }

        let Some(&segment) = segments.first() else {
            for &index in &self.terminals {
                out.push(RawMatch {
                    index,
                    captured: captured.clone(),
                });
            }
            return;
        };
        let rest = &segments[1..];

        if let Ok(i) = self
            .literals
            .binary_search_by(|(key, _)| key.as_str().cmp(segment))
        {
            self.literals[i].1.collect(rest, captured, out);
        }

        // A capture never consumes an empty segment.
        if let (Some(child), false) = (&self.capture, segment.is_empty()) {
            captured.push(segment.to_string());
            child.collect(rest, captured, out);
            captured.pop();
        }
    }
}
