use std::fs;
use std::path::Path;
use std::time::Instant;

use ipf_compiler::{Filter, FilterConfig, FilterStats};

#[derive(Debug, Clone)]
pub struct BuildStats {
    pub rules: usize,
    pub includes: usize,
    pub filter: FilterStats,
    pub total_ms: f64,
}

pub fn load_config(path: &Path) -> Result<FilterConfig, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    FilterConfig::from_json(&text).map_err(|e| format!("'{}': {}", path.display(), e))
}

pub fn build_filter(path: &Path, verbose: bool) -> Result<(Filter, BuildStats), String> {
    let start = Instant::now();
    let config = load_config(path)?;

    if verbose {
        for (i, node) in config.rules.iter().enumerate() {
            println!("  [{}] {} - {} exclusion(s)", i, node.kind, node.excludes.len());
        }
    }

    let filter = config
        .build()
        .map_err(|e| format!("Failed to build filter from '{}': {}", path.display(), e))?;

    let stats = BuildStats {
        rules: config.rules.len(),
        includes: config.includes.len(),
        filter: filter.stats(),
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    Ok((filter, stats))
}
