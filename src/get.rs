//! Device retrieval by ID.
//!
//! Backs the `manuals get`, `manuals pinouts`, and `manuals list` commands.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::Config;
use crate::models::{Device, Domain, Pinout, Specification};
use crate::store::{DeviceStore, SqliteStore};

/// A device together with its child records.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDetail {
    #[serde(flatten)]
    pub device: Device,
    pub specifications: Vec<Specification>,
    pub pinouts: Vec<Pinout>,
}

/// Fetch a device and its specs and pins. `None` when the ID is unknown.
pub async fn get_device_detail(store: &dyn DeviceStore, id: &str) -> Result<Option<DeviceDetail>> {
    let Some(device) = store.get_device(id).await? else {
        return Ok(None);
    };
    let specifications = store.get_specifications(id).await?;
    let pinouts = store.get_pinouts(id).await?;

    Ok(Some(DeviceDetail {
        device,
        specifications,
        pinouts,
    }))
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let detail = get_device_detail(&store, id).await;
    store.close().await;

    let Some(detail) = detail? else {
        bail!("device not found: {}", id);
    };
    let device = &detail.device;

    println!("--- Device ---");
    println!("id:         {}", device.id);
    println!("name:       {}", device.name);
    println!("domain:     {}", device.domain);
    println!("type:       {}", device.device_type);
    println!("path:       {}", device.path);
    println!(
        "indexed_at: {}",
        device.indexed_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    for (key, value) in &device.metadata {
        if key != "specs" {
            println!("{:<11} {}", format!("{}:", key), value);
        }
    }
    println!();

    if !detail.specifications.is_empty() {
        println!("--- Specifications ({}) ---", detail.specifications.len());
        for spec in &detail.specifications {
            match &spec.unit {
                Some(unit) => println!("  {:<28} {} {}", spec.key, spec.value, unit),
                None => println!("  {:<28} {}", spec.key, spec.value),
            }
        }
        println!();
    }

    if !detail.pinouts.is_empty() {
        println!("--- Pinouts ({}) ---", detail.pinouts.len());
        print_pin_table(&detail.pinouts);
        println!();
    }

    println!("--- Content ---");
    println!("{}", device.content);

    Ok(())
}

/// The `manuals pinouts` command, optionally narrowed to one interface.
pub async fn run_pinouts(config: &Config, id: &str, interface: Option<&str>) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let device = store.get_device(id).await?;
    let pins = match (&device, interface) {
        (None, _) => Vec::new(),
        (Some(_), Some(iface)) => store.find_pinouts_by_interface(id, iface).await?,
        (Some(_), None) => store.get_pinouts(id).await?,
    };
    store.close().await;

    let Some(device) = device else {
        bail!("device not found: {}", id);
    };

    if pins.is_empty() {
        match interface {
            Some(iface) => println!("No {} pins on {}.", iface, device.name),
            None => println!("No pinout recorded for {}.", device.name),
        }
        return Ok(());
    }

    println!("{} ({} pins)", device.name, pins.len());
    print_pin_table(&pins);
    Ok(())
}

/// The `manuals list` command.
pub async fn run_list(config: &Config, domain: Option<Domain>) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let devices = store.list_devices(domain).await?;
    store.close().await;

    if devices.is_empty() {
        println!("No devices indexed.");
        return Ok(());
    }

    println!("{:<40} {:<10} {:<16} NAME", "ID", "DOMAIN", "TYPE");
    println!("{}", "-".repeat(90));
    for d in &devices {
        println!(
            "{:<40} {:<10} {:<16} {}",
            d.id,
            d.domain.as_str(),
            d.device_type,
            d.name
        );
    }
    println!();
    println!("{} device(s)", devices.len());
    Ok(())
}

fn print_pin_table(pins: &[Pinout]) {
    println!(
        "  {:>4} {:>5} {:<12} {:<5} {:<28} DESCRIPTION",
        "PIN", "GPIO", "NAME", "PULL", "ALT"
    );
    for pin in pins {
        let gpio = pin
            .gpio_num
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());
        let pull = pin.default_pull.map(|p| p.as_str()).unwrap_or("-");
        let alt = if pin.alt_functions.is_empty() {
            "-".to_string()
        } else {
            pin.alt_functions.join(", ")
        };
        println!(
            "  {:>4} {:>5} {:<12} {:<5} {:<28} {}",
            pin.physical_pin,
            gpio,
            pin.name,
            pull,
            alt,
            pin.description.as_deref().unwrap_or("-")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_detail_includes_children() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(&Config::minimal(tmp.path().join("m.sqlite")))
            .await
            .unwrap();

        let device = Device {
            id: "boards-pico".to_string(),
            domain: Domain::Hardware,
            device_type: "boards".to_string(),
            name: "Pico".to_string(),
            path: "boards/pico.md".to_string(),
            metadata: [(
                "model".to_string(),
                MetadataValue::String("Pico".to_string()),
            )]
            .into_iter()
            .collect(),
            content: "RP2040 board".to_string(),
            indexed_at: Utc::now(),
        };
        store.upsert_device(&device).await.unwrap();
        store
            .upsert_specifications(
                "boards-pico",
                &[Specification {
                    key: "flash".to_string(),
                    value: "2".to_string(),
                    unit: Some("MB".to_string()),
                }],
            )
            .await
            .unwrap();

        let detail = get_device_detail(&store, "boards-pico")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.device.name, "Pico");
        assert_eq!(detail.specifications.len(), 1);
        assert!(detail.pinouts.is_empty());

        assert!(get_device_detail(&store, "missing").await.unwrap().is_none());
    }
}
