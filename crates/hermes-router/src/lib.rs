//! Path pattern matching and route resolution for Hermes.
//!
//! Templated paths are compiled into a trie keyed by path segment. Each node
//! carries ordinary literal edges plus two special edges: one for a named
//! capture (`{name}`) and one for a terminal glob (`**`). Matching walks the
//! trie and, unlike a first-match router, collects *every* pattern that
//! completes against the path, then orders the candidates deterministically:
//!
//! 1. more matched literal segments win;
//! 2. on a tie, fewer named captures win;
//! 3. on a tie, a pattern without `**` wins;
//! 4. remaining ties fall back to registration order.
//!
//! Verb resolution walks the ordered candidates and picks the first whose
//! verb set contains the request method. A path hit without a verb hit is
//! `MethodNotAllowed`; no path hit at all is `NotFound`. Both are ordinary
//! result variants, not panics or exceptions.
//!
//! ```text
//!                     (root)
//!                       │
//!                 "multi-match"
//!               ┌───────┼───────────┐
//!             "foo"   {param}      ** ── glob terminal
//!               │        │
//!             (leaf)   (leaf)
//! ```
//!
//! Empty path segments produced by doubled or trailing slashes are matched
//! as empty literals, never collapsed. Captured values are raw: percent
//! decoding happens at parameter-binding time, not here.

mod matcher;
mod method_set;
mod node;
mod pattern;
mod registry;

pub use matcher::{PathMatcher, PatternMatch};
pub use method_set::MethodSet;
pub use pattern::{path_segments, PathPattern, PatternError, Segment};
pub use registry::{RegistrationError, Resource, ResourceRegistry, RouteError, RouteMatch};
