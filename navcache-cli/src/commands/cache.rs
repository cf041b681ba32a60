//! Cache inspection commands.

use chrono::Utc;

use navcache::cache::{CacheKey, EntryInfo, TieredCacheStore};
use navcache::preload::PreloadStats;
use navcache::stats::StatsSnapshot;

use crate::error::CliError;
use crate::runner::CliRunner;
use crate::ui::widgets::{format_size, EfficiencyBand};

/// Print the cached JSON value for `key`.
pub fn run_get(runner: &CliRunner, key: &str) -> Result<(), CliError> {
    let store = runner.open_store()?;
    let raw = store
        .get_raw(&CacheKey::new(key))
        .ok_or_else(|| CliError::NotCached(key.to_string()))?;

    match serde_json::from_slice::<serde_json::Value>(&raw) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value).map_err(CliError::Json)?),
        Err(_) => println!("{}", String::from_utf8_lossy(&raw)),
    }
    Ok(())
}

/// Remove `key` from both tiers.
pub fn run_invalidate(runner: &CliRunner, key: &str) -> Result<(), CliError> {
    let store = runner.open_store()?;
    if store.invalidate(&CacheKey::new(key)) {
        println!("Invalidated {}", key);
        Ok(())
    } else {
        Err(CliError::NotCached(key.to_string()))
    }
}

/// Remove every entry.
pub fn run_clear(runner: &CliRunner) -> Result<(), CliError> {
    println!(
        "Clearing cache at: {}",
        runner.config().cache.directory.display()
    );
    let store = runner.open_store()?;
    let removed = store.clear();
    println!("Removed {} entries", removed);
    Ok(())
}

/// Print a stats snapshot and the stored entries.
pub fn run_stats(runner: &CliRunner, json: bool) -> Result<(), CliError> {
    let store = runner.open_store()?;
    let entries = entries(&store);
    let snapshot = snapshot_from_entries(&store, &entries);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).map_err(CliError::Json)?
        );
        return Ok(());
    }

    let efficiency = snapshot.efficiency();
    println!("Cache: {}", runner.config().cache.directory.display());
    println!("  Memory:      {} items", snapshot.memory_items);
    println!("  Persistent:  {} items", snapshot.persistent_items);
    println!("  Size:        {}", format_size(snapshot.total_size_bytes));
    println!("  Preloaded:   {}", snapshot.preloaded_count);
    println!(
        "  Efficiency:  {}% ({})",
        efficiency,
        EfficiencyBand::from_percent(efficiency).label()
    );

    if !entries.is_empty() {
        println!();
        for info in &entries {
            println!(
                "  {:<40} {:>10}  {}{}",
                info.key.as_str(),
                format_size(info.size_bytes),
                tiers_label(info),
                if info.preloaded { "  preloaded" } else { "" }
            );
        }
    }
    Ok(())
}

fn entries(store: &TieredCacheStore) -> Vec<EntryInfo> {
    store
        .keys()
        .iter()
        .filter_map(|key| store.entry_info(key))
        .collect()
}

/// Snapshot for a freshly opened store. Preload records do not outlive a
/// process, so the persisted `preloaded` flag stands in for them.
fn snapshot_from_entries(store: &TieredCacheStore, entries: &[EntryInfo]) -> StatsSnapshot {
    let preloaded_keys: Vec<CacheKey> = entries
        .iter()
        .filter(|info| info.preloaded)
        .map(|info| info.key.clone())
        .collect();
    let preload = PreloadStats {
        preloaded_count: preloaded_keys.len(),
        preloaded_keys,
    };
    StatsSnapshot::new(store.stats(), preload, Utc::now())
}

fn tiers_label(info: &EntryInfo) -> &'static str {
    match (info.in_memory, info.in_persistent) {
        (true, true) => "memory+persistent",
        (true, false) => "memory",
        (false, true) => "persistent",
        (false, false) => "-",
    }
}
