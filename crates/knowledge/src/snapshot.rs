//! Build directories and the `CURRENT` pointer.
//!
//! Every build is written into its own `builds/<build_id>/` directory and
//! only becomes visible when `CURRENT` is replaced by rename. Readers resolve
//! `CURRENT` once and then read from a directory nobody writes to.

use crate::config::{get_build_dir, get_builds_dir, get_current_path, manifest_file};
use crate::types::BuildManifest;
use chrono::Utc;
use helpdesk_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Sortable, unique build identifier.
pub fn new_build_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S"), &suffix[..8])
}

/// Identifier of the published build, if any.
pub fn read_current(workspace: &Path, base_name: &str) -> AppResult<Option<String>> {
    let path = get_current_path(workspace, base_name);
    if !path.exists() {
        return Ok(None);
    }

    let build_id = fs::read_to_string(&path)?.trim().to_string();
    if build_id.is_empty() {
        return Err(AppError::CorruptData(format!("{:?} is empty", path)));
    }

    Ok(Some(build_id))
}

/// Make `build_id` the published build.
pub fn publish(workspace: &Path, base_name: &str, build_id: &str) -> AppResult<()> {
    let build_dir = get_build_dir(workspace, base_name, build_id);
    if !manifest_file(&build_dir).exists() {
        return Err(AppError::Knowledge(format!(
            "Build '{}' is incomplete and cannot be published",
            build_id
        )));
    }

    let path = get_current_path(workspace, base_name);
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, format!("{}\n", build_id))?;
    fs::rename(&tmp_path, &path)?;

    tracing::info!("Published build '{}' for base '{}'", build_id, base_name);
    Ok(())
}

/// All build identifiers on disk, oldest first.
pub fn list_builds(workspace: &Path, base_name: &str) -> AppResult<Vec<String>> {
    let dir = get_builds_dir(workspace, base_name);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut builds = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            builds.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    builds.sort();
    Ok(builds)
}

/// Delete every build not listed in `keep`. Returns how many were removed.
pub fn prune(workspace: &Path, base_name: &str, keep: &[&str]) -> AppResult<usize> {
    let mut removed = 0;
    for build_id in list_builds(workspace, base_name)? {
        if keep.contains(&build_id.as_str()) {
            continue;
        }
        fs::remove_dir_all(get_build_dir(workspace, base_name, &build_id))?;
        tracing::debug!("Removed stale build '{}'", build_id);
        removed += 1;
    }
    Ok(removed)
}

pub fn write_manifest(build_dir: &Path, manifest: &BuildManifest) -> AppResult<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(manifest_file(build_dir), json)?;
    Ok(())
}

pub fn read_manifest(build_dir: &Path) -> AppResult<BuildManifest> {
    let path = manifest_file(build_dir);
    let content = fs::read_to_string(&path)
        .map_err(|e| AppError::CorruptData(format!("Failed to read {:?}: {}", path, e)))?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::CorruptData(format!("Failed to parse {:?}: {}", path, e)))
}
