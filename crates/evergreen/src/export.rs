use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use layout::{Category, Layout, OrnamentRecord};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LayoutExport<'a> {
    pub seed: Option<u64>,
    pub total: usize,
    pub counts: BTreeMap<&'static str, usize>,
    pub records: &'a [OrnamentRecord],
}

impl<'a> LayoutExport<'a> {
    pub fn new(layout: &'a Layout, seed: Option<u64>) -> Self {
        Self {
            seed,
            total: layout.len(),
            counts: category_counts(layout),
            records: layout.records(),
        }
    }
}

pub fn category_counts(layout: &Layout) -> BTreeMap<&'static str, usize> {
    Category::ALL
        .iter()
        .map(|&category| (category.as_str(), layout.count(category)))
        .collect()
}

pub fn write_layout(path: &Path, layout: &Layout, seed: Option<u64>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&LayoutExport::new(layout, seed))
        .context("failed to serialise layout")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), records = layout.len(), "wrote layout");
    Ok(())
}
