use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::store::{GRADES_KEY, STUDENTS_KEY};

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT_V1: &str = "roster-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub collections_restored: usize,
}

fn data_entry(key: &str) -> String {
    format!("data/{}.json", key)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Bundles the workspace's collection files into a zip with a manifest
/// carrying a sha256 checksum per entry. Missing collection files are
/// skipped; a workspace with no students yet still exports cleanly.
pub fn export_roster_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let mut payloads: Vec<(String, Vec<u8>)> = Vec::new();
    for key in [STUDENTS_KEY, GRADES_KEY] {
        let path = workspace_path.join(format!("{}.json", key));
        if !path.is_file() {
            continue;
        }
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        payloads.push((data_entry(key), bytes));
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let checksums: serde_json::Map<String, serde_json::Value> = payloads
        .iter()
        .map(|(entry, bytes)| (entry.clone(), json!(sha256_hex(bytes))))
        .collect();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "checksums": checksums,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (entry, bytes) in &payloads {
        zip.start_file(entry.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", entry))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {}", entry))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 1 + payloads.len(),
    })
}

/// Restores collection files from a bundle into the workspace. Every data
/// entry is checked against its manifest checksum before anything is moved
/// into place: a bundle that fails verification on any entry leaves the
/// workspace untouched.
pub fn import_roster_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    // Read and verify every entry before touching the workspace, so a bad
    // entry anywhere in the bundle cannot leave a half-applied restore.
    let mut verified: Vec<(&str, Vec<u8>)> = Vec::new();
    for key in [STUDENTS_KEY, GRADES_KEY] {
        let entry_name = data_entry(key);
        let mut bytes: Vec<u8> = Vec::new();
        match archive.by_name(&entry_name) {
            Ok(mut entry) => {
                entry
                    .read_to_end(&mut bytes)
                    .with_context(|| format!("failed to read entry {}", entry_name))?;
            }
            Err(_) => continue,
        }

        let expected = manifest
            .get("checksums")
            .and_then(|c| c.get(&entry_name))
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest missing checksum for {}", entry_name))?;
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(anyhow!(
                "checksum mismatch for {}: expected {}, got {}",
                entry_name,
                expected,
                actual
            ));
        }
        verified.push((key, bytes));
    }

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
    for (key, bytes) in &verified {
        let dst = workspace_path.join(format!("{}.json", key));
        let tmp = workspace_path.join(format!("{}.json.importing", key));
        std::fs::write(&tmp, bytes)
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        staged.push((tmp, dst));
    }
    for (tmp, dst) in &staged {
        std::fs::rename(tmp, dst)
            .with_context(|| format!("failed to move {} into place", tmp.to_string_lossy()))?;
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        collections_restored: verified.len(),
    })
}
