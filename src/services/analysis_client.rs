// src/services/analysis_client.rs
use crate::errors::DentmapError;
use crate::models::{AnalysisResponse, SelectedImage};
use log::{debug, info};
use reqwest::Client;
use reqwest::multipart::{Form, Part};

/// Client for the remote damage-analysis service. The endpoint is handed in
/// at construction; nothing here reads ambient process state.
pub struct AnalysisClient {
    base_url: String,
    http: Client,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    pub fn with_http_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits the images (in the order given, under one repeated "files"
    /// field) plus the optional vehicle hint, and interprets the response.
    pub async fn analyze(
        &self,
        images: &[SelectedImage],
        vehicle_info: Option<&str>,
    ) -> Result<AnalysisResponse, DentmapError> {
        let mut form = Form::new();
        for image in images {
            let part = Part::stream(image.data.clone())
                .file_name(image.identity.name().to_string())
                .mime_str(&image.content_type)
                .map_err(|e| {
                    DentmapError::InvalidImage(format!(
                        "{}: bad content type {}: {}",
                        image.identity, image.content_type, e
                    ))
                })?;
            form = form.part("files", part);
        }
        if let Some(info) = vehicle_info {
            form = form.text("vehicle_info", info.to_string());
        }

        let url = format!("{}/analyze", self.base_url);
        debug!("Submitting {} image(s) to {}", images.len(), url);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DentmapError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DentmapError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(DentmapError::ServerRejected {
                status: status.as_u16(),
                message: rejection_message(status.as_u16(), &body),
            });
        }

        let parsed = parse_response_body(&body)?;
        info!(
            "Received report {} with {} part(s)",
            parsed.report_id,
            parsed.damage_report.parts.len()
        );
        Ok(parsed)
    }
}

fn parse_response_body(body: &str) -> Result<AnalysisResponse, DentmapError> {
    serde_json::from_str(body).map_err(|e| DentmapError::MalformedResponse(e.to_string()))
}

/// Pulls the `detail` field out of an error body when there is one; the
/// service sends it as a plain string for validation failures and as a
/// structured value for some framework-level errors.
fn rejection_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
            // an empty detail string carries no more than an absent one
            Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }
    format!("request failed with status {}", status)
}
