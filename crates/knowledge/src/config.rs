//! Knowledge base configuration and on-disk layout.
//!
//! ```text
//! .helpdesk/knowledge/<base>/
//!   config.yaml
//!   CURRENT                  id of the published build
//!   builds/<build_id>/
//!     index.bin
//!     meta.sqlite
//!     manifest.json
//! ```

use crate::types::KnowledgeBaseConfig;
use helpdesk_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load knowledge base configuration.
///
/// Loads from `.helpdesk/knowledge/<base>/config.yaml` if it exists,
/// otherwise returns a default config with the provided base name.
pub fn load_config(workspace: &Path, base_name: &str) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace, base_name);

    if !config_path.exists() {
        tracing::debug!(
            "Using default knowledge base config for '{}' (no config file found)",
            base_name
        );
        return Ok(KnowledgeBaseConfig {
            name: base_name.to_string(),
            ..Default::default()
        });
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let mut config: KnowledgeBaseConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Knowledge(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.name = base_name.to_string();

    if config.top_k == 0 {
        return Err(AppError::Config(format!(
            "top_k must be at least 1 in {:?}",
            config_path
        )));
    }

    tracing::debug!("Loaded knowledge base config for '{}'", base_name);
    Ok(config)
}

/// Save knowledge base configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Knowledge(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge base config for '{}'", config.name);
    Ok(())
}

/// Get the base directory for a knowledge base.
pub fn get_base_dir(workspace: &Path, base_name: &str) -> PathBuf {
    workspace
        .join(".helpdesk")
        .join("knowledge")
        .join(base_name)
}

/// Get the path to a base's config file.
pub fn get_config_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("config.yaml")
}

/// Get the pointer file naming the published build.
pub fn get_current_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("CURRENT")
}

/// Get the directory holding all builds of a base.
pub fn get_builds_dir(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("builds")
}

/// Get the directory of one build.
pub fn get_build_dir(workspace: &Path, base_name: &str, build_id: &str) -> PathBuf {
    get_builds_dir(workspace, base_name).join(build_id)
}

/// Index blob inside a build directory.
pub fn index_file(build_dir: &Path) -> PathBuf {
    build_dir.join("index.bin")
}

/// Metadata database inside a build directory.
pub fn meta_file(build_dir: &Path) -> PathBuf {
    build_dir.join("meta.sqlite")
}

/// Manifest inside a build directory.
pub fn manifest_file(build_dir: &Path) -> PathBuf {
    build_dir.join("manifest.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_index::Metric;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "ubuntu").unwrap();

        assert_eq!(config.name, "ubuntu");
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.top_k, 20);
        assert_eq!(config.metric, Metric::Cosine);
        assert!((config.min_total_score - 1.10).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = KnowledgeBaseConfig::default();
        config.name = "askubuntu".to_string();
        config.top_k = 8;
        config.metric = Metric::L2;

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path(), "askubuntu").unwrap();
        assert_eq!(loaded.name, "askubuntu");
        assert_eq!(loaded.top_k, 8);
        assert_eq!(loaded.metric, Metric::L2);
        assert_eq!(loaded.intent.keywords, config.intent.keywords);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), "ubuntu");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "name: ubuntu\nprovider: trigram\nmodel: trigram-v1\nintent:\n  min_confidence: 0.9\n",
        )
        .unwrap();

        let config = load_config(temp.path(), "ubuntu").unwrap();
        assert_eq!(config.top_k, 20);
        assert!((config.intent.min_confidence - 0.9).abs() < f32::EPSILON);
        assert!(!config.intent.keywords.is_empty());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), "ubuntu");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "name: ubuntu\nprovider: trigram\nmodel: trigram-v1\ntop_k: 0\n").unwrap();

        assert!(matches!(
            load_config(temp.path(), "ubuntu"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_layout_paths() {
        let ws = Path::new("/ws");
        assert_eq!(
            get_build_dir(ws, "ubuntu", "abc"),
            PathBuf::from("/ws/.helpdesk/knowledge/ubuntu/builds/abc")
        );
        assert_eq!(
            get_current_path(ws, "ubuntu"),
            PathBuf::from("/ws/.helpdesk/knowledge/ubuntu/CURRENT")
        );
    }
}
