//! Compact HTTP verb sets.

use http::Method;

const SUPPORTED: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
];

/// The set of HTTP verbs a resource accepts, as one bit per verb.
///
/// Only the seven verbs a route may declare are representable; anything
/// else is rejected at registration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodSet(u8);

impl MethodSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Adds a verb; returns `false` for a verb outside the supported seven.
    pub fn insert(&mut self, method: &Method) -> bool {
        match bit(method) {
            Some(b) => {
                self.0 |= b;
                true
            }
            None => false,
        }
    }

    /// Whether `method` is in the set.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        bit(method).is_some_and(|b| self.0 & b != 0)
    }

    /// Whether the set has no verbs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The verbs in the set.
    pub fn iter(&self) -> impl Iterator<Item = Method> + '_ {
        SUPPORTED.iter().filter(|m| self.contains(m)).cloned()
    }
}

fn bit(method: &Method) -> Option<u8> {
    SUPPORTED.iter().position(|m| m == method).map(|i| 1 << i)
}
