use std::path::PathBuf;

use thiserror::Error;

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Data errors: a malformed model file or a model that disagrees with the
/// germline catalogue. The query fails, the process continues.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("transition to unknown state \"{to_state}\" from state \"{from_state}\"")]
    UnknownTransitionTarget { from_state: String, to_state: String },
    #[error(
        "transition probabilities from state \"{state}\" sum to {total}, expected 1"
    )]
    TransitionsDoNotSumToOne { state: String, total: f64 },
    #[error("malformed emission table for state \"{state}\": {reason}")]
    MalformedEmission { state: String, reason: String },
    #[error("model for \"{0}\" has no init state")]
    MissingInitState(String),
    #[error("state name \"{0}\" declared more than once")]
    DuplicateStateName(String),
    #[error("state \"{0}\" is not of the form <family><gene>_<position>")]
    StateNameUnparseable(String),
    #[error("gene name \"{0}\" does not carry a V/D/J region letter")]
    UnknownRegion(String),
    #[error("failed to read model file {path}")]
    ModelRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model file {path}")]
    ModelParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
