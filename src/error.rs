use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdjacencyError>;

#[derive(Debug, Error)]
pub enum AdjacencyError {
    #[error("targets of node {node} are not sorted ascending at position {position}")]
    UnsortedTargets { node: u64, position: usize },
    #[error("degree {degree} of node {node} exceeds the {available} provided targets")]
    DegreeMismatch { node: u64, degree: usize, available: usize },
    #[error("property channel {channel} of node {node} holds {len} values, expected {degree}")]
    PropertyLengthMismatch { node: u64, channel: usize, len: usize, degree: usize },
    #[error("expected {expected} property channels, got {actual}")]
    PropertyChannelMismatch { expected: usize, actual: usize },
    #[error("node {node} is outside the directory partition [{start}, {end})")]
    NodeOutOfPartition { node: u64, start: u64, end: u64 },
    #[error("arena capacity exhausted while allocating {requested} bytes")]
    CapacityExhausted { requested: usize },
    #[error("arena page {0} was handed out but never sealed; a compressor outlived the build")]
    UnsealedArena(u32),
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("build terminated before completion")]
    Terminated,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("malformed token {token:?} on line {line}")]
    Parse { line: usize, token: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for AdjacencyError {
    fn from(value: bincode::Error) -> Self {
        AdjacencyError::Serialization(value.to_string())
    }
}
