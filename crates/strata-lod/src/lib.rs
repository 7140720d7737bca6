//! Distance-driven LOD management: level selection policy, per-mesh profile
//! cache, per-entity state machines, and the update scheduler that amortizes
//! recomputation across cycles.

mod cache;
mod compute;
mod entity;
mod error;
mod policy;
mod profile;
mod scheduler;

pub use cache::{ProfileCache, ProfileParams};
pub use compute::{DistancePipeline, DistanceResult, DistanceTask};
pub use entity::{AuxElement, LodEntity, LodState};
pub use error::LodError;
pub use policy::{LevelSchedule, LodPolicy};
pub use profile::{LevelRepresentation, LodProfile};
pub use scheduler::{CycleStats, LevelObserver, SchedulerOptions, UpdateScheduler};
