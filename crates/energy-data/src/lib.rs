//! Data layer for scan energy attribution.
//!
//! Responsible for discovering and reading rotated power-monitor logs,
//! reconstructing measurement blocks across file boundaries, matching them to
//! catalogue scan windows and running the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod builder;
pub mod catalogue;
pub mod continuity;
pub mod export;
pub mod matcher;
pub mod reader;
pub mod reconstruct;

pub use energy_core as core;

pub use aggregator::aggregate_energy;
pub use matcher::find_window;
pub use reconstruct::{reconstruct, reconstruct_segment};
