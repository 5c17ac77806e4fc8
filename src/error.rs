use thiserror::Error;

/// Errors surfaced by the abstraction engine.
///
/// A failed search is not an error: `find_path`/`get_path` return `None` and
/// the engine restores its pre-query state. Everything here is either a bad
/// argument or a broken build invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required node argument does not exist in the graph.
    #[error("no node with id {0}")]
    MissingNode(i32),

    /// An endpoint is already an abstract node (level >= 1).
    #[error("node {0} has non-zero abstraction level {1}")]
    NonZeroAbstractionLevel(i32, i32),

    /// An endpoint fails terrain/clearance admissibility for the query.
    #[error("node {id} at ({x},{y}) is not traversable under capability {capability:#x} clearance {clearance}")]
    NotTraversable {
        id: i32,
        x: i32,
        y: i32,
        capability: u8,
        clearance: i32,
    },

    /// An abstract edge had no cached path when reconstruction required one.
    #[error("no cached path for abstract edge {0}")]
    CacheMiss(i32),

    /// Cached segments failed to join during reconstruction.
    #[error("cached path segments do not overlap at node {0}")]
    SegmentDiscontinuity(i32),

    /// A terrain grid constructor received malformed rows.
    #[error("invalid terrain grid: {0}")]
    InvalidGrid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
