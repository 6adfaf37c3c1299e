// src/services/mod.rs
pub mod analysis_client;
pub mod preview;
pub mod upload_batch;

pub use analysis_client::AnalysisClient;
pub use preview::{PreviewStore, ThumbnailStore};
pub use upload_batch::{SubmissionState, UploadBatch};
