//! Pipeline configuration: defaults, JSON file, command-line overrides

use std::path::Path;

use anyhow::{Context, Result};

use super::args::Cli;
use crate::pipeline::PipelineConfig;

/// Read a pipeline configuration from a JSON file.
///
/// Missing sections fall back to their defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Write a pipeline configuration as pretty JSON
pub fn save_config(config: &PipelineConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Apply command-line flags on top of a configuration
pub fn apply_overrides(mut config: PipelineConfig, cli: &Cli) -> PipelineConfig {
    if let Some(test_size) = cli.test_size {
        config.split.test_size = test_size;
    }
    if let Some(seed) = cli.seed {
        config.split.seed = seed;
        config.forest.seed = seed;
    }
    if let Some(trees) = cli.trees {
        config.forest.n_trees = trees;
    }
    if let Some(depth) = cli.max_depth {
        config.forest.max_depth = Some(depth);
    }
    if let Some(split) = cli.min_samples_split {
        config.forest.min_samples_split = split;
    }
    if let Some(leaf) = cli.min_samples_leaf {
        config.forest.min_samples_leaf = leaf;
    }
    if let Some(encoding) = cli.nominal_encoding {
        config.schema.default_nominal = encoding;
    }
    config
}

/// Defaults, then the config file (if any), then command-line flags
pub fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let base = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    Ok(apply_overrides(base, cli))
}
