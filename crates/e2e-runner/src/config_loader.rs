//! Resolves `--config` paths into loaded `ExperimentConfig`s.
//!
//! A path is either a test directory (containing `test.yaml`), a parent
//! directory of `test-*` subdirectories (batch mode), or a single `.yaml`
//! file.

use anyhow::{anyhow, Context, Result};
use coordination::ExperimentConfig;
use std::path::{Path, PathBuf};

/// One resolved config file together with the path it came from, for error
/// messages.
pub struct LoadedConfig {
    pub source: PathBuf,
    pub config: ExperimentConfig,
}

pub fn resolve_config_paths(paths: &[PathBuf]) -> Result<Vec<LoadedConfig>> {
    let mut out = Vec::new();
    for path in paths {
        out.extend(resolve_one(path)?);
    }
    Ok(out)
}

fn resolve_one(path: &Path) -> Result<Vec<LoadedConfig>> {
    if path.is_file() {
        return Ok(vec![load_yaml_file(path)?]);
    }

    if !path.is_dir() {
        return Err(anyhow!("config path does not exist: {}", path.display()));
    }

    let direct = path.join("test.yaml");
    if direct.is_file() {
        return Ok(vec![load_yaml_file(&direct)?]);
    }

    // Batch mode: a parent of `test-*` subdirectories.
    let mut batch = Vec::new();
    let entries = std::fs::read_dir(path).with_context(|| format!("reading config dir {}", path.display()))?;
    for entry in entries.flatten() {
        let sub = entry.path();
        if !sub.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("test-") {
            continue;
        }
        let yaml = sub.join("test.yaml");
        if yaml.is_file() {
            batch.push(load_yaml_file(&yaml)?);
        }
    }

    if batch.is_empty() {
        return Err(anyhow!("no test.yaml found under {}", path.display()));
    }
    Ok(batch)
}

fn load_yaml_file(path: &Path) -> Result<LoadedConfig> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config = ExperimentConfig::from_yaml(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(LoadedConfig {
        source: path.to_path_buf(),
        config,
    })
}

/// Restrict a batch to the requested experiment ids, if any were given.
pub fn filter_by_ids(configs: Vec<LoadedConfig>, ids: &[String]) -> Vec<LoadedConfig> {
    if ids.is_empty() {
        return configs;
    }
    configs.into_iter().filter(|c| ids.contains(&c.config.experiment_id)).collect()
}
