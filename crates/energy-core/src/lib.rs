//! Shared types for the scan-energy workspace.
//!
//! Holds the block and scan-window model, the log-line parser, timestamp and
//! duration helpers, formatting, configuration and the common error type.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{EnergyError, Result};
pub use models::{Block, Command, LogLine, LogSegment, ScanEnergy, ScanKey, ScanWindow};
