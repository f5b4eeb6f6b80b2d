//! Storage abstraction for the manuals index.
//!
//! The [`DeviceStore`] trait is the seam between the indexing/search core
//! and its callers (CLI, or any tool/HTTP layer built on top). The SQLite
//! backend lives in [`sqlite`].
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert_device`](DeviceStore::upsert_device) | Insert or replace a device and its full-text entry |
//! | [`upsert_pinouts`](DeviceStore::upsert_pinouts) | Replace the pin rows of a device |
//! | [`upsert_specifications`](DeviceStore::upsert_specifications) | Replace the spec rows of a device |
//! | [`clear_all`](DeviceStore::clear_all) | Empty every table |
//! | [`search`](DeviceStore::search) | Ranked full-text search with filters |
//! | [`get_device`](DeviceStore::get_device) | Fetch one device by ID |
//! | [`get_pinouts`](DeviceStore::get_pinouts) | Fetch the pins of a device |
//! | [`list_devices`](DeviceStore::list_devices) | List devices without their bodies |
//! | [`stats`](DeviceStore::stats) | Row counts |

pub mod sqlite;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{
    DatabaseStats, Device, DeviceSummary, Domain, Pinout, SearchOptions, SearchResult,
    Specification,
};

pub use sqlite::SqliteStore;

/// Abstract storage backend for device records.
///
/// Implementations must be safe for many concurrent readers. Writers
/// that clear and repopulate the store hold [`reindex_lock`](DeviceStore::reindex_lock)
/// for the duration of the pass.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Insert or replace the device sharing `device.id`, updating its
    /// full-text entry (name, body, tags) in the same step.
    async fn upsert_device(&self, device: &Device) -> Result<()>;

    /// Replace all pin rows of `device_id` with `pinouts`. Duplicate
    /// physical pins keep the last row.
    async fn upsert_pinouts(&self, device_id: &str, pinouts: &[Pinout]) -> Result<()>;

    /// Replace all specification rows of `device_id`.
    async fn upsert_specifications(&self, device_id: &str, specs: &[Specification])
        -> Result<()>;

    /// Remove every record. All-or-nothing.
    async fn clear_all(&self) -> Result<()>;

    /// Full-text search. An empty query yields no results.
    async fn search(&self, opts: &SearchOptions) -> Result<Vec<SearchResult>>;

    async fn get_device(&self, id: &str) -> Result<Option<Device>>;

    /// Pins ordered by physical pin number.
    async fn get_pinouts(&self, device_id: &str) -> Result<Vec<Pinout>>;

    /// Pins whose name or alternate functions mention `interface`
    /// (case-insensitive), e.g. `i2c` or `spi`.
    async fn find_pinouts_by_interface(
        &self,
        device_id: &str,
        interface: &str,
    ) -> Result<Vec<Pinout>>;

    async fn get_specifications(&self, device_id: &str) -> Result<Vec<Specification>>;

    /// Devices ordered by name, optionally restricted to one domain.
    async fn list_devices(&self, domain: Option<Domain>) -> Result<Vec<DeviceSummary>>;

    async fn stats(&self) -> Result<DatabaseStats>;

    /// Lock serializing full reindex passes against this store.
    fn reindex_lock(&self) -> &Mutex<()>;
}
