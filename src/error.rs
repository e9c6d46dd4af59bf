//! Error taxonomy for the core pipeline stages.
//!
//! Loading, configuration and output failures are reported through `anyhow`
//! at the edges of the tool. The stages in between are pure transforms and
//! fail only in the ways listed here.

use std::fmt;
use thiserror::Error;

/// Pipeline stage names, used to say where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reproject,
    Filter,
    Join,
    Aggregate,
    Assemble,
    Partition,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reproject => "reproject",
            Stage::Filter => "filter",
            Stage::Join => "join",
            Stage::Aggregate => "aggregate",
            Stage::Assemble => "assemble",
            Stage::Partition => "partition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CrsError {
    #[error("unknown coordinate reference system `{0}`")]
    Unknown(String),

    #[error("malformed coordinate reference system identifier `{0}`")]
    Malformed(String),

    #[error("cannot build a transform from {from} to {to}")]
    Create {
        from: String,
        to: String,
        source: proj::ProjCreateError,
    },

    /// The coordinate cannot be represented in the requested system.
    #[error("coordinate ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain {
        crs: String,
        x: f64,
        y: f64,
        source: Option<proj::ProjError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinKeyError {
    #[error("zone keys `{first}` and `{second}` both normalize to `{normalized}`")]
    DuplicateZone {
        first: String,
        second: String,
        normalized: String,
    },

    #[error("zone key `{0}` is empty after normalization")]
    EmptyKey(String),

    #[error("aggregate zone key `{0}` matches no polygon")]
    UnmatchedKey(String),
}

/// A fatal failure of one pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage: record {record}: {source}")]
    Crs {
        stage: Stage,
        record: String,
        #[source]
        source: CrsError,
    },

    #[error("assemble stage: {0}")]
    JoinKey(#[from] JoinKeyError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Crs { stage, .. } => *stage,
            PipelineError::JoinKey(_) => Stage::Assemble,
        }
    }
}

/// Non-fatal notice that a stage produced an empty collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyResult {
    pub stage: Stage,
}

impl fmt::Display for EmptyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage produced no records", self.stage)
    }
}
