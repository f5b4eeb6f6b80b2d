//! Index statistics and health overview.
//!
//! Summarizes what's indexed: device counts per domain, pinout and
//! specification totals, and the categories, manufacturers, tags, and
//! metadata keys seen across devices.

use anyhow::Result;

use crate::config::Config;
use crate::store::{DeviceStore, SqliteStore};

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;

    let stats = store.stats().await?;
    let categories = store.all_categories().await?;
    let manufacturers = store.all_manufacturers().await?;
    let tags = store.all_tags().await?;
    let schema = store.metadata_schema().await?;
    store.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Manuals Index — Database Stats");
    println!("==============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Devices:     {}", stats.total_devices);
    println!("    hardware:  {}", stats.hardware_count);
    println!("    software:  {}", stats.software_count);
    println!("    protocol:  {}", stats.protocol_count);
    println!("  Pinouts:     {}", stats.total_pinouts);
    println!("  Specs:       {}", stats.total_specs);

    print_counts("By category", &categories);
    print_counts("By manufacturer", &manufacturers);

    if !tags.is_empty() {
        println!();
        println!("  Tags ({}): {}", tags.len(), tags.join(", "));
    }

    if !schema.is_empty() {
        println!();
        println!("  Metadata keys:");
        for (key, kinds) in &schema {
            let kinds: Vec<&str> = kinds.iter().copied().collect();
            println!("    {:<20} {}", key, kinds.join(" | "));
        }
    }

    println!();
    Ok(())
}

fn print_counts(title: &str, rows: &[(String, i64)]) {
    if rows.is_empty() {
        return;
    }
    println!();
    println!("  {}:", title);
    for (value, count) in rows {
        println!("    {:<32} {:>6}", value, count);
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
