// src/services/upload_batch.rs
use crate::errors::DentmapError;
use crate::models::{AnalysisResponse, CandidateFile, ImageIdentity, SelectedImage};
use crate::services::analysis_client::AnalysisClient;
use crate::services::preview::{PreviewStore, ThumbnailStore};
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
}

/// The user's in-progress set of images and metadata, plus the lifecycle of
/// one submission to the analysis service.
///
/// The batch owns its preview resources outright: a preview is created when
/// an image is admitted and released in the same call that removes the
/// image, so live previews always equal batch membership. Dropping the
/// batch drops the store and with it everything still held.
pub struct UploadBatch {
    images: Vec<SelectedImage>,
    vehicle_info: Option<String>,
    state: SubmissionState,
    last_error: Option<String>,
    report: Option<AnalysisResponse>,
    previews: Box<dyn PreviewStore>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::with_preview_store(Box::new(ThumbnailStore::new()))
    }

    pub fn with_preview_store(previews: Box<dyn PreviewStore>) -> Self {
        Self {
            images: Vec::new(),
            vehicle_info: None,
            state: SubmissionState::Idle,
            last_error: None,
            report: None,
            previews,
        }
    }

    /// Admits candidate files in the order given, appending after anything
    /// already held. A candidate whose identity is already in the batch is
    /// skipped silently; re-picking the same file must not create a second
    /// entry or a second preview. Returns how many files were admitted.
    pub fn add_images(&mut self, files: Vec<CandidateFile>) -> Result<usize, DentmapError> {
        let mut added = 0;
        for file in files {
            let identity = file.identity();
            if self.images.iter().any(|img| img.identity == identity) {
                debug!("Skipping duplicate selection {}", identity);
                continue;
            }

            let preview = self.previews.create(&identity, &file.data)?;
            self.images.push(SelectedImage {
                identity,
                content_type: file.content_type,
                data: file.data,
                preview,
            });
            added += 1;
        }
        Ok(added)
    }

    /// Removes the one entry matching `identity` and releases its preview.
    /// Returns false when no such image is held.
    pub fn remove_image(&mut self, identity: &ImageIdentity) -> bool {
        match self.images.iter().position(|img| &img.identity == identity) {
            Some(pos) => {
                let image = self.images.remove(pos);
                self.previews.release(image.preview);
                true
            }
            None => false,
        }
    }

    /// Empties the batch, discarding any report or error, and releases
    /// every preview.
    pub fn clear(&mut self) {
        for image in self.images.drain(..) {
            self.previews.release(image.preview);
        }
        self.report = None;
        self.last_error = None;
    }

    /// Sets the free-text vehicle hint. Whitespace-only input counts as not
    /// provided and will be left out of the request entirely.
    pub fn set_vehicle_info(&mut self, text: &str) {
        let trimmed = text.trim();
        self.vehicle_info = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    /// Runs one submission. Fails up front, with no network interaction,
    /// when the batch is empty or a submission is already in flight. On
    /// failure the images are kept as-is so the user can resubmit; on
    /// success the returned report replaces any previous one. Either way
    /// the batch ends back in `Idle`, with `last_error` holding the
    /// outcome's message for display.
    pub async fn submit(
        &mut self,
        client: &AnalysisClient,
    ) -> Result<&AnalysisResponse, DentmapError> {
        if self.state == SubmissionState::Submitting {
            // not recorded: the in-flight submission's outcome is still
            // pending and its message must not be overwritten
            return Err(DentmapError::SubmissionInFlight);
        }
        if self.images.is_empty() {
            return Err(self.record_failure(DentmapError::EmptyBatch));
        }

        self.state = SubmissionState::Submitting;
        let result = client
            .analyze(&self.images, self.vehicle_info.as_deref())
            .await;
        self.state = SubmissionState::Idle;

        match result {
            Ok(response) => {
                self.last_error = None;
                Ok(&*self.report.insert(response))
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                Err(self.record_failure(e))
            }
        }
    }

    fn record_failure(&mut self, error: DentmapError) -> DentmapError {
        self.last_error = Some(error.to_string());
        error
    }

    pub fn images(&self) -> &[SelectedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn vehicle_info(&self) -> Option<&str> {
        self.vehicle_info.as_deref()
    }

    pub fn report(&self) -> Option<&AnalysisResponse> {
        self.report.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Preview bytes for an image currently in the batch.
    pub fn preview(&self, identity: &ImageIdentity) -> Option<&[u8]> {
        self.images
            .iter()
            .find(|img| &img.identity == identity)
            .and_then(|img| self.previews.get(img.preview))
    }

    /// Number of preview resources currently alive in the owning store.
    pub fn live_previews(&self) -> usize {
        self.previews.live_count()
    }
}

impl Default for UploadBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::{DateTime, Duration, Utc};

    fn png_bytes() -> Bytes {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([60, 60, 200]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(out)
    }

    fn picked_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn candidate(name: &str, ms_offset: i64) -> CandidateFile {
        CandidateFile {
            name: name.to_string(),
            modified: picked_at() + Duration::milliseconds(ms_offset),
            content_type: "image/png".to_string(),
            data: png_bytes(),
        }
    }

    #[test]
    fn repicking_the_same_file_is_a_no_op() {
        let mut batch = UploadBatch::new();
        assert_eq!(batch.add_images(vec![candidate("a.png", 0)]).unwrap(), 1);
        assert_eq!(batch.add_images(vec![candidate("a.png", 0)]).unwrap(), 0);

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.live_previews(), 1);

        // same name but a different mtime is a different file
        assert_eq!(batch.add_images(vec![candidate("a.png", 5)]).unwrap(), 1);
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn batch_order_is_first_seen_order() {
        let mut batch = UploadBatch::new();
        batch
            .add_images(vec![candidate("a.png", 0), candidate("b.png", 0)])
            .unwrap();
        batch
            .add_images(vec![candidate("a.png", 0), candidate("c.png", 0)])
            .unwrap();

        let names: Vec<&str> = batch.images().iter().map(|i| i.identity.name()).collect();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn previews_track_membership_exactly() {
        let mut batch = UploadBatch::new();
        batch
            .add_images(vec![
                candidate("a.png", 0),
                candidate("b.png", 0),
                candidate("c.png", 0),
            ])
            .unwrap();
        assert_eq!(batch.live_previews(), 3);

        let gone = candidate("b.png", 0).identity();
        assert!(batch.remove_image(&gone));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.live_previews(), 2);
        assert!(batch.preview(&gone).is_none());
        assert!(!batch.remove_image(&gone));

        batch.clear();
        assert_eq!(batch.len(), 0);
        assert_eq!(batch.live_previews(), 0);
    }

    #[test]
    fn preview_bytes_are_available_while_held() {
        let mut batch = UploadBatch::new();
        batch.add_images(vec![candidate("a.png", 0)]).unwrap();
        let id = candidate("a.png", 0).identity();
        assert!(batch.preview(&id).is_some());
    }

    #[test]
    fn undecodable_file_is_rejected_and_not_admitted() {
        let mut batch = UploadBatch::new();
        let bogus = CandidateFile {
            name: "notes.txt".to_string(),
            modified: picked_at(),
            content_type: "text/plain".to_string(),
            data: Bytes::from_static(b"not an image"),
        };

        let err = batch.add_images(vec![bogus]).unwrap_err();
        assert!(matches!(err, DentmapError::InvalidImage(_)));
        assert!(batch.is_empty());
        assert_eq!(batch.live_previews(), 0);
    }

    #[test]
    fn vehicle_info_is_trimmed_and_blank_means_absent() {
        let mut batch = UploadBatch::new();

        batch.set_vehicle_info("  2018 Honda Civic  ");
        assert_eq!(batch.vehicle_info(), Some("2018 Honda Civic"));

        batch.set_vehicle_info("   ");
        assert_eq!(batch.vehicle_info(), None);
    }

    #[tokio::test]
    async fn empty_batch_submit_never_touches_the_network() {
        // An unresolvable endpoint: any attempted request would surface as
        // Transport, not EmptyBatch.
        let client = AnalysisClient::new("http://127.0.0.1:1");
        let mut batch = UploadBatch::new();

        let err = batch.submit(&client).await.unwrap_err();
        assert!(matches!(err, DentmapError::EmptyBatch));
        assert_eq!(batch.state(), SubmissionState::Idle);
        assert!(batch.last_error().is_some());
    }

    #[tokio::test]
    async fn submit_while_in_flight_is_rejected_without_touching_state() {
        let client = AnalysisClient::new("http://127.0.0.1:1");
        let mut batch = UploadBatch::new();
        batch.add_images(vec![candidate("a.png", 0)]).unwrap();
        batch.last_error = Some("earlier failure".to_string());
        batch.state = SubmissionState::Submitting;

        let err = batch.submit(&client).await.unwrap_err();
        assert!(matches!(err, DentmapError::SubmissionInFlight));
        assert_eq!(batch.last_error(), Some("earlier failure"));
        assert_eq!(batch.state(), SubmissionState::Submitting);
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn failed_submission_preserves_the_batch() {
        // Port 1 refuses the connection, so this exercises the transport
        // failure path without a server.
        let client = AnalysisClient::new("http://127.0.0.1:1");
        let mut batch = UploadBatch::new();
        batch.add_images(vec![candidate("a.png", 0)]).unwrap();

        let err = batch.submit(&client).await.unwrap_err();
        assert!(matches!(err, DentmapError::Transport(_)));

        assert_eq!(batch.state(), SubmissionState::Idle);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.live_previews(), 1);
        assert!(batch.report().is_none());
        assert!(batch.last_error().is_some());
    }
}
