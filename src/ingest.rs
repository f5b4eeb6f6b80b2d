//! Indexing pipeline orchestration.
//!
//! Walks a documentation tree, parses every markdown file, and writes the
//! resulting devices, pinouts, and specifications to a [`DeviceStore`].
//!
//! The walk is a lazy sequence of [`ScanEvent`]s ([`scan_markdown`]) that
//! [`run_index`] folds into an [`IndexResult`]. Failures are per file: a
//! file that cannot be read, parsed, or stored is logged and counted, and
//! the walk moves on. Only a failed clear aborts the pass.
//!
//! Writes are not wrapped in one outer transaction. A cancelled pass
//! leaves the files processed so far in the index.

use anyhow::Result as AnyResult;
use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Span};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::models::{Device, Domain, IndexResult, Metadata, MetadataValue};
use crate::parser::{parse_markdown_file, ParsedDocument};
use crate::store::{DeviceStore, SqliteStore};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Parameters for one indexing pass.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub docs_path: PathBuf,
    /// Remove every existing record before walking.
    pub clear: bool,
    pub follow_symlinks: bool,
    pub exclude_globs: Vec<String>,
}

impl IndexOptions {
    pub fn new(docs_path: impl Into<PathBuf>) -> Self {
        Self {
            docs_path: docs_path.into(),
            clear: true,
            follow_symlinks: false,
            exclude_globs: Vec::new(),
        }
    }
}

/// One step of the documentation walk.
#[derive(Debug)]
pub enum ScanEvent {
    /// A directory entry could not be read. Not counted as a file.
    Inaccessible(IndexError),
    /// A markdown file and the outcome of parsing it.
    File {
        path: PathBuf,
        outcome: Result<ParsedDocument>,
    },
}

/// Lazily walk `root` in file-name order, parsing each markdown file.
///
/// Directories, non-markdown files, and paths matching `excludes` are
/// skipped silently.
pub fn scan_markdown<'a>(
    root: &'a Path,
    follow_symlinks: bool,
    excludes: &'a GlobSet,
) -> impl Iterator<Item = ScanEvent> + 'a {
    WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    return Some(ScanEvent::Inaccessible(IndexError::FileAccess {
                        path,
                        source,
                    }));
                }
            };

            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                return None;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if excludes.is_match(relative) {
                return None;
            }

            let path = entry.into_path();
            let outcome = parse_markdown_file(&path);
            Some(ScanEvent::File { path, outcome })
        })
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|md| ext.eq_ignore_ascii_case(md))
        })
}

/// Display name for a device: the model, else manufacturer and model,
/// else `"Unknown"`.
pub fn device_name(metadata: &Metadata) -> String {
    let model = metadata.get("model").and_then(MetadataValue::as_str);
    let manufacturer = metadata.get("manufacturer").and_then(MetadataValue::as_str);

    match (manufacturer, model) {
        (_, Some(model)) if !model.trim().is_empty() => model.to_string(),
        (Some(manufacturer), Some(model)) => format!("{} {}", manufacturer, model)
            .trim()
            .to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Run one indexing pass against `store`.
///
/// Holds the store's reindex lock for the whole pass. When `cancel`
/// flips to `true` the walk stops before the next file and the result is
/// marked cancelled.
pub async fn run_index(
    store: &dyn DeviceStore,
    opts: &IndexOptions,
    cancel: Option<watch::Receiver<bool>>,
) -> Result<IndexResult> {
    let started = Instant::now();
    let _guard = store.reindex_lock().lock().await;

    let span = info_span!("index", root = %opts.docs_path.display());
    let mut result = IndexResult::default();

    if !opts.docs_path.is_dir() {
        return Err(IndexError::FileAccess {
            path: opts.docs_path.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "documentation root is not a directory",
            ),
        });
    }

    let excludes = build_excludes(&opts.exclude_globs).map_err(|e| IndexError::Parse {
        path: opts.docs_path.clone(),
        message: e.to_string(),
    })?;

    if opts.clear {
        info!(parent: &span, "clearing existing index");
        store.clear_all().await?;
    }

    info!(parent: &span, "scanning documentation directory");

    for event in scan_markdown(&opts.docs_path, opts.follow_symlinks, &excludes) {
        if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            warn!(parent: &span, processed = result.total_files, "indexing cancelled");
            result.cancelled = true;
            break;
        }

        match event {
            ScanEvent::Inaccessible(err) => {
                warn!(parent: &span, error = %err, "failed to access path");
            }
            ScanEvent::File { path, outcome } => {
                result.total_files += 1;
                match outcome {
                    Ok(doc) => match index_document(store, &path, doc, &span).await {
                        Some(domain) => {
                            result.success_count += 1;
                            *result.by_domain.entry(domain).or_insert(0) += 1;
                        }
                        None => result.error_count += 1,
                    },
                    Err(err) => {
                        warn!(parent: &span, path = %path.display(), error = %err, "failed to parse file");
                        result.error_count += 1;
                    }
                }
            }
        }
    }

    result.duration = started.elapsed();

    info!(
        parent: &span,
        total_files = result.total_files,
        success = result.success_count,
        errors = result.error_count,
        hardware = result.domain_count(Domain::Hardware),
        software = result.domain_count(Domain::Software),
        protocol = result.domain_count(Domain::Protocol),
        duration_ms = result.duration.as_millis() as u64,
        cancelled = result.cancelled,
        "indexing complete"
    );

    Ok(result)
}

/// Store one parsed document. Returns the domain on success, `None` when
/// the device row could not be written. Pinout and specification failures
/// are warnings only; the device row stands.
async fn index_document(
    store: &dyn DeviceStore,
    path: &Path,
    doc: ParsedDocument,
    span: &Span,
) -> Option<Domain> {
    let device = Device {
        name: device_name(&doc.metadata),
        id: doc.id,
        domain: doc.domain,
        device_type: doc.device_type,
        path: path.display().to_string(),
        metadata: doc.metadata,
        content: doc.content,
        indexed_at: Utc::now(),
    };

    if let Err(err) = store.upsert_device(&device).await {
        warn!(parent: span, path = %path.display(), id = %device.id, error = %err, "failed to insert device");
        return None;
    }

    if device.domain == Domain::Hardware {
        if let Err(err) = store.upsert_pinouts(&device.id, &doc.pinouts).await {
            warn!(parent: span, path = %path.display(), id = %device.id, error = %err, "failed to insert pinouts");
        }
    }

    if let Err(err) = store
        .upsert_specifications(&device.id, &doc.specifications)
        .await
    {
        warn!(parent: span, path = %path.display(), id = %device.id, error = %err, "failed to insert specifications");
    }

    debug!(
        parent: span,
        id = %device.id,
        name = %device.name,
        domain = %device.domain,
        r#type = %device.device_type,
        pinouts = doc.pinouts.len(),
        "indexed device"
    );

    Some(device.domain)
}

fn build_excludes(extra: &[String]) -> AnyResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in ["**/.git/**", "**/node_modules/**"]
        .into_iter()
        .chain(extra.iter().map(String::as_str))
    {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// The `manuals index` command.
pub async fn run_index_command(config: &Config, docs: Option<PathBuf>, clear: bool) -> AnyResult<()> {
    let docs_path = docs
        .or_else(|| config.docs.root.clone())
        .ok_or_else(|| anyhow::anyhow!("No documentation root: pass --docs or set [docs].root"))?;

    let store = SqliteStore::open(config).await?;

    let opts = IndexOptions {
        docs_path,
        clear,
        follow_symlinks: config.docs.follow_symlinks,
        exclude_globs: config.docs.exclude_globs.clone(),
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let outcome = run_index(&store, &opts, Some(cancel_rx)).await;
    ctrl_c.abort();
    store.close().await;
    let result = outcome?;

    println!("index {}", opts.docs_path.display());
    println!("  total files: {}", result.total_files);
    println!("  indexed: {}", result.success_count);
    println!("  errors: {}", result.error_count);
    for domain in Domain::ALL {
        println!("  {}: {}", domain, result.domain_count(domain));
    }
    println!("  duration: {:.2?}", result.duration);
    if result.cancelled {
        println!("cancelled (partial index)");
    } else {
        println!("ok");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), MetadataValue::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_device_name_prefers_model() {
        assert_eq!(
            device_name(&meta(&[("model", "DS18B20"), ("manufacturer", "Maxim")])),
            "DS18B20"
        );
    }

    #[test]
    fn test_device_name_manufacturer_with_blank_model() {
        assert_eq!(
            device_name(&meta(&[("model", " "), ("manufacturer", "Maxim")])),
            "Maxim"
        );
    }

    #[test]
    fn test_device_name_unknown() {
        assert_eq!(device_name(&meta(&[("manufacturer", "Maxim")])), "Unknown");
        assert_eq!(device_name(&Metadata::new()), "Unknown");
    }

    #[test]
    fn test_is_markdown() {
        assert!(is_markdown(Path::new("a/b/README.MD")));
        assert!(is_markdown(Path::new("notes.markdown")));
        assert!(!is_markdown(Path::new("notes.txt")));
        assert!(!is_markdown(Path::new("md")));
    }

    #[test]
    fn test_scan_yields_only_markdown_with_outcomes() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("sensors")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("sensors/good.md"), "---\nmodel: A\n---\nbody").unwrap();
        fs::write(root.join("sensors/bad.md"), "---\ntags: [x\n---\nbody").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(root.join(".git/HEAD.md"), "ignored").unwrap();

        let excludes = build_excludes(&[]).unwrap();
        let events: Vec<ScanEvent> = scan_markdown(root, false, &excludes).collect();
        assert_eq!(events.len(), 2);

        let ok = events
            .iter()
            .filter(|e| matches!(e, ScanEvent::File { outcome: Ok(_), .. }))
            .count();
        let failed = events
            .iter()
            .filter(|e| matches!(e, ScanEvent::File { outcome: Err(IndexError::Parse { .. }), .. }))
            .count();
        assert_eq!((ok, failed), (1, 1));
    }

    #[test]
    fn test_extra_excludes_applied() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("drafts")).unwrap();
        fs::write(root.join("drafts/wip.md"), "draft").unwrap();
        fs::write(root.join("keep.md"), "keep").unwrap();

        let excludes = build_excludes(&["drafts/**".to_string()]).unwrap();
        let paths: Vec<PathBuf> = scan_markdown(root, false, &excludes)
            .filter_map(|e| match e {
                ScanEvent::File { path, .. } => Some(path),
                ScanEvent::Inaccessible(_) => None,
            })
            .collect();
        assert_eq!(paths, vec![root.join("keep.md")]);
    }

    /// Delegates to SQLite but refuses devices whose id contains `reject`,
    /// and every pinout and specification write when `reject_children` is set.
    struct RejectingStore {
        inner: SqliteStore,
        reject: &'static str,
        reject_children: bool,
    }

    impl RejectingStore {
        fn child_err(&self, id: &str) -> Option<IndexError> {
            self.reject_children.then(|| IndexError::SecondaryWrite {
                id: id.to_string(),
                source: sqlx::Error::Protocol("rejected".into()),
            })
        }
    }

    #[async_trait::async_trait]
    impl DeviceStore for RejectingStore {
        async fn upsert_device(&self, device: &Device) -> Result<()> {
            if device.id.contains(self.reject) {
                return Err(IndexError::StorageWrite {
                    id: device.id.clone(),
                    source: sqlx::Error::Protocol("rejected".into()),
                });
            }
            self.inner.upsert_device(device).await
        }
        async fn upsert_pinouts(&self, id: &str, pins: &[crate::models::Pinout]) -> Result<()> {
            if let Some(err) = self.child_err(id) {
                return Err(err);
            }
            self.inner.upsert_pinouts(id, pins).await
        }
        async fn upsert_specifications(
            &self,
            id: &str,
            specs: &[crate::models::Specification],
        ) -> Result<()> {
            if let Some(err) = self.child_err(id) {
                return Err(err);
            }
            self.inner.upsert_specifications(id, specs).await
        }
        async fn clear_all(&self) -> Result<()> {
            self.inner.clear_all().await
        }
        async fn search(
            &self,
            opts: &crate::models::SearchOptions,
        ) -> Result<Vec<crate::models::SearchResult>> {
            self.inner.search(opts).await
        }
        async fn get_device(&self, id: &str) -> Result<Option<Device>> {
            self.inner.get_device(id).await
        }
        async fn get_pinouts(&self, id: &str) -> Result<Vec<crate::models::Pinout>> {
            self.inner.get_pinouts(id).await
        }
        async fn find_pinouts_by_interface(
            &self,
            id: &str,
            interface: &str,
        ) -> Result<Vec<crate::models::Pinout>> {
            self.inner.find_pinouts_by_interface(id, interface).await
        }
        async fn get_specifications(&self, id: &str) -> Result<Vec<crate::models::Specification>> {
            self.inner.get_specifications(id).await
        }
        async fn list_devices(
            &self,
            domain: Option<Domain>,
        ) -> Result<Vec<crate::models::DeviceSummary>> {
            self.inner.list_devices(domain).await
        }
        async fn stats(&self) -> Result<crate::models::DatabaseStats> {
            self.inner.stats().await
        }
        fn reindex_lock(&self) -> &tokio::sync::Mutex<()> {
            self.inner.reindex_lock()
        }
    }

    async fn open_store(tmp: &TempDir) -> SqliteStore {
        let config = Config::minimal(tmp.path().join("index.sqlite"));
        SqliteStore::open(&config).await.unwrap()
    }

    fn write_docs(root: &Path) {
        fs::create_dir_all(root.join("hw")).unwrap();
        fs::write(
            root.join("hw/good.md"),
            "---\ncategory: sensors/temperature\nmodel: GOOD1\n---\n| Pin | GPIO | Name |\n|---|---|---|\n| 1 | - | VCC |\n",
        )
        .unwrap();
        fs::write(
            root.join("hw/other.md"),
            "---\ncategory: sensors/temperature\nmodel: BAD1\n---\nbody",
        )
        .unwrap();
        fs::write(
            root.join("proto.md"),
            "---\ncategory: protocols/i2c\nmodel: I2C\n---\nbus",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_storage_failure_is_counted_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        write_docs(&docs);
        let store = RejectingStore {
            inner: open_store(&tmp).await,
            reject: "bad1",
            reject_children: false,
        };

        let result = run_index(&store, &IndexOptions::new(&docs), None)
            .await
            .unwrap();
        assert_eq!(result.total_files, 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.domain_count(Domain::Hardware), 1);
        assert_eq!(result.domain_count(Domain::Protocol), 1);
        assert!(!result.cancelled);

        let pins = store.get_pinouts("sensors-temperature-good1").await.unwrap();
        assert_eq!(pins.len(), 1);
        assert!(store.get_device("sensors-temperature-bad1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_child_write_failure_keeps_device() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("board.md"),
            "---\ncategory: boards/mcu\nmodel: Uno\nspecs:\n  flash: 32\n---\n| Pin | GPIO | Name |\n|---|---|---|\n| 1 | 0 | RX |\n",
        )
        .unwrap();
        let store = RejectingStore {
            inner: open_store(&tmp).await,
            reject: "never-matches",
            reject_children: true,
        };

        let result = run_index(&store, &IndexOptions::new(&docs), None)
            .await
            .unwrap();
        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 0);
        assert!(store.get_device("boards-mcu-uno").await.unwrap().is_some());
        assert!(store.get_pinouts("boards-mcu-uno").await.unwrap().is_empty());
        assert!(store.get_specifications("boards-mcu-uno").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_pin_rows_are_not_errors() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("board.md"),
            "---\ncategory: boards/mcu\nmodel: Uno\n---\n| Pin | GPIO | Name |\n|---|---|---|\n| one | 0 | RX |\n| 2 | 1 | TX |\n| 3 |\n",
        )
        .unwrap();
        let store = open_store(&tmp).await;

        let result = run_index(&store, &IndexOptions::new(&docs), None)
            .await
            .unwrap();
        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 0);
        let pins = store.get_pinouts("boards-mcu-uno").await.unwrap();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].name, "TX");
    }

    #[tokio::test]
    async fn test_cancel_before_first_file() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        write_docs(&docs);
        let store = open_store(&tmp).await;

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let result = run_index(&store, &IndexOptions::new(&docs), Some(rx))
            .await
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.total_files, 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal_and_keeps_index() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        write_docs(&docs);
        let store = open_store(&tmp).await;
        run_index(&store, &IndexOptions::new(&docs), None)
            .await
            .unwrap();

        let err = run_index(&store, &IndexOptions::new(tmp.path().join("nope")), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::FileAccess { .. }));
        assert_eq!(store.stats().await.unwrap().total_devices, 3);
    }
}
