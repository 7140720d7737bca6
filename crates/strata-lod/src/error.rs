//! Error taxonomy for the LOD core.
//!
//! Every variant is recoverable at the boundary of a single entity or a
//! single cycle: the scheduler logs, skips the unit of work, and keeps
//! processing. Nothing here is allowed to stop the scheduler itself.

use thiserror::Error;

/// Errors surfaced by the LOD core.
#[derive(Debug, Error)]
pub enum LodError {
    /// Configuration error: the source mesh has no geometry. LOD is
    /// disabled for that entity; the entity is not registered.
    #[error("source mesh {0:?} has no triangles, LOD disabled for this entity")]
    EmptyMesh(String),

    /// Invariant violation: a transition targeted a level the profile does
    /// not have. The swap is skipped for that entity only.
    #[error("level {requested} out of range, profile has {available} levels")]
    MissingLevel {
        /// The level index the transition asked for.
        requested: usize,
        /// The number of levels the profile actually has.
        available: usize,
    },
}
