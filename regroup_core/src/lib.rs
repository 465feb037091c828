#![forbid(unsafe_code)]

//! Core list-editing engine for grouped, set-aware workout ordering.
//!
//! This crate provides:
//! - Domain types (set-groups, exercise items, group sentinels, working list)
//! - Reconstruction of the working list from persisted workouts
//! - Group collapse/expand and membership resolution around drags
//! - Set-group and group lifecycle operations
//! - Multi-select group creation
//! - Serialization back to the persisted shape
//! - Editing sessions and a file-backed save sink

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod set_groups;
pub mod reconstruct;
pub mod collapse;
pub mod membership;
pub mod lifecycle;
pub mod selection;
pub mod serialize;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{ExerciseCatalog, ExerciseLookup};
pub use config::Config;
pub use set_groups::{duplicate_item, SetGroupOp};
pub use reconstruct::{reconstruct, ReconstructionSource};
pub use collapse::{collapse_for_drag, expand_all};
pub use membership::{resolve, settle_after_drag};
pub use lifecycle::{create_group, delete_item, dissolve_group, toggle_group_kind};
pub use selection::{SelectionController, SelectionState};
pub use serialize::{serialize, SerializedWorkout};
pub use session::{EditingSession, SessionCommand};
pub use store::{load_snapshot, JsonFileSink, MemorySink, SavedWorkout, WorkoutSink};
