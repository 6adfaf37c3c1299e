// src/main.rs
use anyhow::{Context, bail};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::path::Path;

mod errors;
mod models;
mod services;
mod zones;

use crate::errors::DentmapError;
use crate::models::CandidateFile;
use crate::services::{AnalysisClient, UploadBatch};
use crate::zones::{Zone, group_by_zone};

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let (paths, vehicle_info) = parse_args()?;
    if paths.is_empty() {
        bail!("usage: dentmap [--vehicle <description>] <image>...");
    }

    let api_base =
        std::env::var("DENTMAP_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let client = AnalysisClient::new(api_base);
    info!("Using analysis service at {}", client.base_url());

    let mut batch = UploadBatch::new();
    if let Some(info) = &vehicle_info {
        batch.set_vehicle_info(info);
    }

    let mut candidates = Vec::new();
    for path in &paths {
        candidates.push(read_candidate(Path::new(path))?);
    }
    let added = batch.add_images(candidates)?;
    info!("Selected {} image(s)", added);

    match batch.submit(&client).await {
        Ok(response) => {
            println!("Report {}", response.report_id);
            if let Some(url) = &response.sheet_url {
                println!("Logged at {}", url);
            }
            let report = &response.damage_report;
            if !report.notes.is_empty() {
                println!("Notes: {}", report.notes);
            }
            if let Some(total) = report.overall_estimated_repair_cost {
                println!("Overall estimated repair cost: {:.2}", total);
            }

            let groups = group_by_zone(&report.parts);
            for zone in Zone::ALL {
                println!("\n[{}]", zone);
                let parts = &groups[&zone];
                if parts.is_empty() {
                    println!("  no damage reported");
                    continue;
                }
                for part in parts {
                    let severity = part
                        .severity
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "  {} (severity {}): {}",
                        part.part_name, severity, part.damage_description
                    );
                    if let Some(cost) = part.total_cost {
                        println!("    estimated cost {:.2}", cost);
                    }
                }
            }
            Ok(())
        }
        Err(e) => {
            if let DentmapError::ServerRejected { status, .. } = &e {
                warn!("Analysis service answered with status {}", status);
            }
            // The batch keeps the images, so the user can rerun as-is.
            bail!("analysis failed: {}", e);
        }
    }
}

fn parse_args() -> anyhow::Result<(Vec<String>, Option<String>)> {
    let mut paths = Vec::new();
    let mut vehicle_info = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--vehicle" => match args.next() {
                Some(value) => vehicle_info = Some(value),
                None => bail!("--vehicle needs a value"),
            },
            _ => paths.push(arg),
        }
    }

    Ok((paths, vehicle_info))
}

fn read_candidate(path: &Path) -> anyhow::Result<CandidateFile> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let modified: DateTime<Utc> = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::from)
        .with_context(|| format!("reading mtime of {}", path.display()))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(CandidateFile {
        content_type: content_type_for(path),
        name,
        modified,
        data: Bytes::from(data),
    })
}

fn content_type_for(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
    .to_string()
}
