//! xtask scan-catalog / list — build and browse the catalog of a local folder.
//!
//! The folder stands in for the card: `--root ./music` maps `/` to `./music`,
//! and the index lands in `./music/.playlist/`.

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use library::CatalogIndex;
use platform::storage_local::LocalFileStorage;
use platform::PlayerConfig;

/// Names fetched per catalog read.
const PAGE: usize = 16;

/// Catalog over `root` with the default layout.
pub(crate) fn open(root: &Path, cfg: &PlayerConfig) -> Result<CatalogIndex<LocalFileStorage>> {
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    let root = root
        .to_str()
        .ok_or_else(|| anyhow!("music root is not valid UTF-8"))?;
    Ok(CatalogIndex::new(LocalFileStorage::new(root), cfg))
}

/// Entry point for `scan-catalog`.
pub fn scan(root: &Path) -> Result<()> {
    println!();
    println!("{}", format!("🔍 Scanning {}...", root.display()).cyan().bold());

    let mut catalog = open(root, &PlayerConfig::DEFAULT)?;
    let started = Instant::now();
    let count = catalog.scan().map_err(|e| anyhow!("scan failed: {e}"))?;

    println!(
        "{}",
        format!("  ✓ {count} tracks indexed in {:.2}s", started.elapsed().as_secs_f64()).green()
    );
    Ok(())
}

/// Entry point for `list`.
pub fn list(root: &Path, start: u32, count: Option<u32>) -> Result<()> {
    let mut catalog = open(root, &PlayerConfig::DEFAULT)?;
    let total = catalog.load().map_err(|e| anyhow!("catalog load failed: {e}"))?;
    let end = count.map_or(total, |c| start.saturating_add(c).min(total));

    let mut ordinal = start;
    while ordinal < end {
        let window = end.saturating_sub(ordinal).min(PAGE as u32);
        let names = catalog.get_names::<PAGE>(ordinal, window);
        if names.is_empty() {
            break;
        }
        for name in &names {
            println!("{ordinal:>5}  {name}");
            ordinal = ordinal.saturating_add(1);
        }
    }
    println!("{}", format!("{total} tracks").dimmed());
    Ok(())
}
