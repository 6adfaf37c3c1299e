// src/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DentmapError {
    #[error("no images selected")]
    EmptyBatch,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("could not reach the analysis service: {0}")]
    Transport(String),

    #[error("{message}")]
    ServerRejected { status: u16, message: String },

    #[error("could not interpret the analysis response: {0}")]
    MalformedResponse(String),

    #[error("not a usable image: {0}")]
    InvalidImage(String),
}
