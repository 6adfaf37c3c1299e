// src/models.rs
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Natural key for a selected image: filename plus last-modified time.
/// Two picks of the same on-disk file collapse onto the same identity,
/// which is what drives duplicate detection in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageIdentity {
    name: String,
    modified_ms: i64,
}

impl ImageIdentity {
    pub fn new(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            modified_ms: modified.timestamp_millis(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.modified_ms)
    }
}

/// Opaque, revocable preview resource id. Minted by a preview store and
/// only meaningful to the store that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle(pub(crate) u64);

/// A file the user has picked but that has not been admitted to a batch yet.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub modified: DateTime<Utc>,
    pub content_type: String,
    pub data: Bytes,
}

impl CandidateFile {
    pub fn identity(&self) -> ImageIdentity {
        ImageIdentity::new(self.name.clone(), self.modified)
    }
}

/// One image admitted to the upload batch, with its live preview resource.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub identity: ImageIdentity,
    pub content_type: String,
    pub data: Bytes,
    pub preview: PreviewHandle,
}

/// One damaged-part line item as reported by the analysis service.
/// Every field the service might omit or garble defaults instead of
/// failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamagedPart {
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(default)]
    pub part_name: String,
    #[serde(default)]
    pub damage_description: String,
    #[serde(default)]
    pub severity: Option<i64>,
    #[serde(default)]
    pub material_cost: Option<f64>,
    #[serde(default)]
    pub paint_cost: Option<f64>,
    #[serde(default)]
    pub structural_cost: Option<f64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageReport {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub overall_estimated_repair_cost: Option<f64>,
    #[serde(default)]
    pub parts: Vec<DamagedPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub report_id: String,
    #[serde(default)]
    pub sheet_url: Option<String>,
    pub damage_report: DamageReport,
}
