// src/services/preview.rs
use crate::errors::DentmapError;
use crate::models::{ImageIdentity, PreviewHandle};
use image::GenericImageView;
use image::imageops::FilterType;
use std::collections::HashMap;

/// Owns the revocable preview resources backing the images in a batch.
///
/// The batch drives the lifecycle: a preview is created when an image is
/// admitted and released when the image leaves the batch. `release` on a
/// handle the store no longer knows is a no-op, so the exactly-once
/// discipline lives with the caller, not here.
pub trait PreviewStore {
    fn create(
        &mut self,
        identity: &ImageIdentity,
        data: &[u8],
    ) -> Result<PreviewHandle, DentmapError>;

    fn release(&mut self, handle: PreviewHandle);

    /// Display bytes for a live handle, if the store keeps any.
    fn get(&self, handle: PreviewHandle) -> Option<&[u8]>;

    /// Number of previews currently held.
    fn live_count(&self) -> usize;
}

const THUMBNAIL_EDGE: u32 = 256;

/// Default preview store: decodes the image, downscales it to a bounded
/// JPEG thumbnail, and holds the encoded bytes until released. Decoding
/// here doubles as content validation, so a file that is not actually an
/// image is rejected before it ever enters a batch.
pub struct ThumbnailStore {
    thumbnails: HashMap<PreviewHandle, Vec<u8>>,
    next_id: u64,
}

impl ThumbnailStore {
    pub fn new() -> Self {
        Self {
            thumbnails: HashMap::new(),
            next_id: 0,
        }
    }
}

impl Default for ThumbnailStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewStore for ThumbnailStore {
    fn create(
        &mut self,
        identity: &ImageIdentity,
        data: &[u8],
    ) -> Result<PreviewHandle, DentmapError> {
        let img = image::load_from_memory(data)
            .map_err(|e| DentmapError::InvalidImage(format!("{}: {}", identity, e)))?;

        let (width, height) = img.dimensions();
        let thumb = if width > THUMBNAIL_EDGE || height > THUMBNAIL_EDGE {
            img.resize(THUMBNAIL_EDGE, THUMBNAIL_EDGE, FilterType::Triangle)
        } else {
            img
        };

        let mut encoded = Vec::new();
        thumb
            .write_to(
                &mut std::io::Cursor::new(&mut encoded),
                image::ImageFormat::Jpeg,
            )
            .map_err(|e| DentmapError::InvalidImage(format!("{}: {}", identity, e)))?;

        let handle = PreviewHandle(self.next_id);
        self.next_id += 1;
        self.thumbnails.insert(handle, encoded);
        Ok(handle)
    }

    fn release(&mut self, handle: PreviewHandle) {
        self.thumbnails.remove(&handle);
    }

    fn get(&self, handle: PreviewHandle) -> Option<&[u8]> {
        self.thumbnails.get(&handle).map(Vec::as_slice)
    }

    fn live_count(&self) -> usize {
        self.thumbnails.len()
    }
}
