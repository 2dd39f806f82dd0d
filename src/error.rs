//! Error types
//!
//! Config errors block a level from starting. Pool errors are recovered
//! locally by the caller (skip the spawn or drop and keep playing).

use thiserror::Error;

/// Malformed pool, level or path configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("pool '{0}' already exists")]
    DuplicatePool(String),

    #[error("invalid template for pool '{pool}': {reason}")]
    InvalidTemplate { pool: String, reason: String },

    #[error("spawn table of level {level} is empty")]
    EmptySpawnTable { level: u32 },

    #[error("spawn table of level {level} has zero total weight")]
    ZeroSpawnWeight { level: u32 },

    #[error("path needs at least 2 valid waypoints, got {0}")]
    DegeneratePath(usize),

    #[error("path has zero total length")]
    ZeroLengthPath,

    #[error("level {level} uses path movement but defines no path")]
    MissingPath { level: u32 },

    #[error("invalid range for {what}: min {min} > max {max}")]
    InvalidRange { what: &'static str, min: f32, max: f32 },

    #[error("invalid value for {what}: {value}")]
    InvalidValue { what: &'static str, value: f32 },

    #[error("level {0} not found")]
    UnknownLevel(u32),

    #[error("level catalog is empty")]
    EmptyCatalog,

    #[error("failed to parse level data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read level data: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures when borrowing from or returning to a pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("pool '{0}' does not exist")]
    UnknownPool(String),

    #[error("pool '{0}' is exhausted and cannot grow")]
    Exhausted(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

pub type Result<T> = std::result::Result<T, Error>;
