//! Concurrent two-phase catalog scanning.
//!
//! # Phases
//!
//! 1. Every loose bin file under the scan root is resolved on the worker
//!    pool with a loose-file hint.
//! 2. Every archive under the scan root is opened in turn; its bin entries
//!    are ordered rail vehicles first, then preloads, then the rest, and
//!    resolved on the worker pool with an in-archive hint.
//!
//! Failures are logged and counted, never fatal to the batch. Fragments are
//! counted and left out of the catalog. Cancellation is checked after each
//! item; records already inserted stay in the catalog.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::collection::VehicleCatalog;
use super::progress::{percent_of, ProgressReporter, ScanPhase, ScanProgressCallback};
use crate::config::{EngineConfig, DEFAULT_ARCHIVE_EXTENSION};
use crate::identity::{join_asset_path, BLUEPRINT_EXTENSION};
use crate::storage::has_extension;
use crate::vehicle::{ResolutionContext, VehicleKind, VehicleResolver};

/// Archive entry prefixes resolved first, in order.
const PRIORITY_PREFIXES: &[&str] = &["railvehicles/", "preload/"];

/// Errors that prevent a scan from starting.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scan root is not a directory under the assets root.
    #[error("scan root {} is not a directory under the assets root", .0.display())]
    InvalidRoot(PathBuf),

    #[error("failed to build scan worker pool: {0}")]
    WorkerPool(#[from] ThreadPoolBuildError),
}

/// Totals for one catalog scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub loose_files: usize,
    pub archives: usize,
    pub archive_entries: usize,
    /// Records added to the catalog.
    pub resolved: usize,
    pub failed: usize,
    pub fragments_skipped: usize,
    /// Records whose identity was already catalogued.
    pub duplicates: usize,
    pub unreadable_archives: usize,
    pub cancelled: bool,
    pub loose_elapsed: Duration,
    pub archive_elapsed: Duration,
}

/// Marker for work stopped by the cancellation token.
struct Cancelled;

#[derive(Default)]
struct ScanTally {
    resolved: AtomicUsize,
    failed: AtomicUsize,
    fragments: AtomicUsize,
    duplicates: AtomicUsize,
}

/// Builds a [`VehicleCatalog`] from a directory subtree.
pub struct CatalogScanner {
    resolver: Arc<VehicleResolver>,
    pool: ThreadPool,
    archive_extension: String,
}

impl CatalogScanner {
    /// Create a scanner with a pool of `workers` threads.
    pub fn new(resolver: Arc<VehicleResolver>, workers: usize) -> Result<Self, ScanError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("railstock-scan-{i}"))
            .build()?;

        Ok(Self {
            resolver,
            pool,
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
        })
    }

    pub fn from_config(
        resolver: Arc<VehicleResolver>,
        config: &EngineConfig,
    ) -> Result<Self, ScanError> {
        Ok(Self::new(resolver, config.scan_workers)?
            .with_archive_extension(config.archive_extension.clone()))
    }

    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        self.archive_extension = extension.into();
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Scan `root` into `catalog`.
    ///
    /// The final progress event is always `Complete` at 100, including
    /// after cancellation.
    pub fn scan(
        &self,
        root: &Path,
        catalog: &VehicleCatalog,
        progress: Option<ScanProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let storage = self.resolver.storage();
        if !root.is_dir() || storage.relative_to_root(root).is_none() {
            return Err(ScanError::InvalidRoot(root.to_path_buf()));
        }

        let reporter = ProgressReporter::new(progress);
        let tally = ScanTally::default();
        let mut report = ScanReport::default();

        let started = Instant::now();
        reporter.begin_phase(ScanPhase::LooseFiles);
        let loose = self.loose_phase(root, catalog, &reporter, &tally, cancel, &mut report);
        report.loose_elapsed = started.elapsed();
        info!(
            files = report.loose_files,
            elapsed_secs = report.loose_elapsed.as_secs_f64(),
            "Loose-file scan finished"
        );

        if loose.is_err() || cancel.is_cancelled() {
            debug!("Scan cancelled during loose-file phase");
            report.cancelled = true;
        } else {
            let started = Instant::now();
            reporter.begin_phase(ScanPhase::Archives);
            if self
                .archive_phase(root, catalog, &reporter, &tally, cancel, &mut report)
                .is_err()
            {
                warn!(root = %root.display(), "Archive scan cancelled");
                report.cancelled = true;
            }
            report.archive_elapsed = started.elapsed();
            info!(
                archives = report.archives,
                entries = report.archive_entries,
                elapsed_secs = report.archive_elapsed.as_secs_f64(),
                "Archive scan finished"
            );
        }

        reporter.complete();

        report.resolved = tally.resolved.load(Ordering::Relaxed);
        report.failed = tally.failed.load(Ordering::Relaxed);
        report.fragments_skipped = tally.fragments.load(Ordering::Relaxed);
        report.duplicates = tally.duplicates.load(Ordering::Relaxed);
        debug!(?report, "Catalog scan complete");
        Ok(report)
    }

    fn loose_phase(
        &self,
        root: &Path,
        catalog: &VehicleCatalog,
        reporter: &ProgressReporter,
        tally: &ScanTally,
        cancel: &CancellationToken,
        report: &mut ScanReport,
    ) -> Result<(), Cancelled> {
        let storage = self.resolver.storage();
        let files: Vec<String> = find_files(root, BLUEPRINT_EXTENSION)
            .iter()
            .filter_map(|path| storage.relative_to_root(path))
            .collect();
        report.loose_files = files.len();
        debug!(files = files.len(), root = %root.display(), "Found loose blueprint files");

        let done = AtomicUsize::new(0);
        let total = files.len();
        self.pool.install(|| {
            files.par_iter().try_for_each(|path| {
                self.process(path, &ResolutionContext::loose_file(), catalog, tally);
                let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.report(percent_of(done, total));
                if cancel.is_cancelled() {
                    Err(Cancelled)
                } else {
                    Ok(())
                }
            })
        })
    }

    fn archive_phase(
        &self,
        root: &Path,
        catalog: &VehicleCatalog,
        reporter: &ProgressReporter,
        tally: &ScanTally,
        cancel: &CancellationToken,
        report: &mut ScanReport,
    ) -> Result<(), Cancelled> {
        let storage = self.resolver.storage();
        let archives = find_files(root, &self.archive_extension);
        report.archives = archives.len();
        debug!(archives = archives.len(), root = %root.display(), "Found archives");

        let archive_count = archives.len();
        for (index, archive_path) in archives.iter().enumerate() {
            let base = percent_of(index, archive_count);
            reporter.report(base);

            let archive = match storage.open_archive(archive_path) {
                Ok(archive) => archive,
                Err(e) => {
                    debug!(error = %e, "Skipping archive");
                    report.unreadable_archives += 1;
                    continue;
                }
            };
            let prefix = archive_path
                .parent()
                .and_then(|dir| storage.relative_to_root(dir))
                .unwrap_or_default();

            let entries = prioritized_entries(archive.entry_names(), BLUEPRINT_EXTENSION);
            report.archive_entries += entries.len();
            debug!(
                archive = %archive_path.display(),
                entries = entries.len(),
                "Scanning archive"
            );

            let done = AtomicUsize::new(0);
            let total = entries.len();
            self.pool.install(|| {
                entries.par_iter().try_for_each(|entry| {
                    let context = ResolutionContext::in_archive(archive_path.clone(), *entry);
                    self.process(&join_asset_path(&prefix, entry), &context, catalog, tally);

                    let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                    let own = percent_of(done, total * archive_count);
                    reporter.report(base + own);
                    if cancel.is_cancelled() {
                        Err(Cancelled)
                    } else {
                        Ok(())
                    }
                })
            })?;
        }

        Ok(())
    }

    fn process(
        &self,
        bin_path: &str,
        context: &ResolutionContext,
        catalog: &VehicleCatalog,
        tally: &ScanTally,
    ) {
        match self.resolver.resolve(bin_path, context) {
            Ok(record) if record.kind() == VehicleKind::PreloadFragment => {
                tally.fragments.fetch_add(1, Ordering::Relaxed);
            }
            Ok(record) => {
                if catalog.insert(record) {
                    tally.resolved.fetch_add(1, Ordering::Relaxed);
                } else {
                    tally.duplicates.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) => {
                debug!(path = %bin_path, error = %e, kind = ?e.kind(), "Failed to load vehicle");
                tally.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// All files under `root` with `extension`, ignoring case, sorted.
fn find_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/**/*.{}",
        Pattern::escape(&root.to_string_lossy()),
        Pattern::escape(extension)
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files: Vec<PathBuf> = match glob::glob_with(&pattern, options) {
        Ok(paths) => paths
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file() && has_extension(path, extension))
            .collect(),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid scan pattern");
            Vec::new()
        }
    };
    files.sort();
    files
}

/// Archive entries with the blueprint extension, rail vehicles first, then
/// preloads, then the rest. Order within each group is archive order.
pub fn prioritized_entries<'a>(names: &'a [String], extension: &str) -> Vec<&'a str> {
    let mut entries: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| has_extension(Path::new(name), extension))
        .collect();
    entries.sort_by_key(|name| entry_priority(name));
    entries
}

fn entry_priority(name: &str) -> usize {
    let name = name.replace('\\', "/").to_ascii_lowercase();
    let name = name.trim_start_matches('/');
    PRIORITY_PREFIXES
        .iter()
        .position(|prefix| name.starts_with(prefix))
        .unwrap_or(PRIORITY_PREFIXES.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScanProgress;
    use crate::test_support::{consist_xml, write_asset, write_zip, LeafBlueprint, TestEngine};
    use parking_lot::Mutex;
    use proptest::prelude::*;

    fn scanner(engine: &TestEngine, workers: usize) -> CatalogScanner {
        CatalogScanner::new(Arc::new(engine.vehicles()), workers).unwrap()
    }

    #[test]
    fn test_prioritized_entries() {
        let names: Vec<String> = [
            "Other/Misc.bin",
            "Preload/Train.bin",
            "RailVehicles/Loco.bin",
            "RailVehicles/Textures/Loco.ace",
            "railvehicles\\Wagon.BIN",
            "Preload/Rake.bin",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(
            prioritized_entries(&names, "bin"),
            vec![
                "RailVehicles/Loco.bin",
                "railvehicles\\Wagon.BIN",
                "Preload/Train.bin",
                "Preload/Rake.bin",
                "Other/Misc.bin",
            ]
        );
    }

    #[test]
    fn test_scan_loose_and_archived() {
        let engine = TestEngine::new();
        write_asset(
            engine.assets(),
            "DTG\\Freight\\RailVehicles\\Loco.bin",
            LeafBlueprint::engine("Loco").xml().as_bytes(),
        );
        write_asset(
            engine.assets(),
            "DTG\\Freight\\Preload\\Rake.bin",
            consist_xml("cConsistFragmentBlueprint", None, &[]).as_bytes(),
        );
        let wagon = LeafBlueprint::wagon("Hopper").xml();
        let loco_copy = LeafBlueprint::engine("Packed Loco").xml();
        let preload = consist_xml("cConsistBlueprint", Some("Coal Train"), &[]);
        write_zip(
            &engine.assets().join("DTG/Freight/Assets.ap"),
            &[
                ("Preload/Coal.bin", preload.as_bytes()),
                ("RailVehicles/Hopper.bin", wagon.as_bytes()),
                ("RailVehicles/Loco.bin", loco_copy.as_bytes()),
                ("RailVehicles/Broken.bin", b"<oops".as_slice()),
            ],
        );

        let catalog = VehicleCatalog::new();
        let report = scanner(&engine, 2)
            .scan(engine.assets(), &catalog, None, &CancellationToken::new())
            .unwrap();

        assert_eq!(report.loose_files, 2);
        assert_eq!(report.archives, 1);
        assert_eq!(report.archive_entries, 4);
        assert_eq!(report.fragments_skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.resolved, 3);
        assert!(!report.cancelled);

        let names: Vec<String> = catalog.records().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names[0], "Loco");
        assert!(names.contains(&"Hopper".to_string()));
        assert!(names.contains(&"Coal Train Preload".to_string()));
    }

    #[test]
    fn test_progress_ends_complete() {
        let engine = TestEngine::new();
        for i in 0..5 {
            write_asset(
                engine.assets(),
                &format!("DTG\\Freight\\RailVehicles\\W{i}.bin"),
                LeafBlueprint::wagon(&format!("W{i}")).xml().as_bytes(),
            );
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ScanProgressCallback = Arc::new(move |p: ScanProgress| sink.lock().push(p));

        let catalog = VehicleCatalog::new();
        scanner(&engine, 3)
            .scan(engine.assets(), &catalog, Some(callback), &CancellationToken::new())
            .unwrap();

        let events = events.lock();
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            events.last().copied(),
            Some(ScanProgress {
                phase: ScanPhase::Complete,
                percent: 100
            })
        );
        let loose: Vec<u32> = events
            .iter()
            .filter(|p| p.phase == ScanPhase::LooseFiles)
            .map(|p| p.percent)
            .collect();
        assert!(loose.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(loose.last(), Some(&100));
    }

    #[test]
    fn test_cancelled_before_start_skips_archives() {
        let engine = TestEngine::new();
        write_asset(
            engine.assets(),
            "DTG\\Freight\\RailVehicles\\Loco.bin",
            LeafBlueprint::engine("Loco").xml().as_bytes(),
        );
        let wagon = LeafBlueprint::wagon("Hopper").xml();
        write_zip(
            &engine.assets().join("DTG/Freight/Assets.ap"),
            &[("RailVehicles/Hopper.bin", wagon.as_bytes())],
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let catalog = VehicleCatalog::new();
        let report = scanner(&engine, 1)
            .scan(engine.assets(), &catalog, None, &cancel)
            .unwrap();

        // The in-flight item completes before cancellation is observed.
        assert!(report.cancelled);
        assert_eq!(catalog.len(), 1);
        assert_eq!(report.archives, 0);
    }

    #[test]
    fn test_cancelled_during_archives_keeps_partial_results() {
        let engine = TestEngine::new();
        write_asset(
            engine.assets(),
            "DTG\\Alpha\\RailVehicles\\Loco.bin",
            LeafBlueprint::engine("Loco").xml().as_bytes(),
        );
        let first: Vec<String> = (0..3)
            .map(|i| LeafBlueprint::wagon(&format!("Alpha Wagon {i}")).xml())
            .collect();
        let second: Vec<String> = (0..3)
            .map(|i| LeafBlueprint::wagon(&format!("Beta Wagon {i}")).xml())
            .collect();
        write_zip(
            &engine.assets().join("DTG/Alpha/Alpha.ap"),
            &[
                ("RailVehicles/W0.bin", first[0].as_bytes()),
                ("RailVehicles/W1.bin", first[1].as_bytes()),
                ("RailVehicles/W2.bin", first[2].as_bytes()),
            ],
        );
        write_zip(
            &engine.assets().join("DTG/Beta/Beta.ap"),
            &[
                ("RailVehicles/W0.bin", second[0].as_bytes()),
                ("RailVehicles/W1.bin", second[1].as_bytes()),
                ("RailVehicles/W2.bin", second[2].as_bytes()),
            ],
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ScanProgressCallback = Arc::new(move |p: ScanProgress| {
            if p.phase == ScanPhase::Archives && p.percent > 0 {
                trigger.cancel();
            }
            sink.lock().push(p);
        });

        let catalog = VehicleCatalog::new();
        let report = scanner(&engine, 1)
            .scan(engine.assets(), &catalog, Some(callback), &cancel)
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.loose_files, 1);
        assert_eq!(report.archives, 2);

        let names: Vec<String> = catalog
            .records()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names[0], "Loco");
        assert!(names.iter().any(|n| n.starts_with("Alpha Wagon")));
        assert!(!names.iter().any(|n| n.starts_with("Beta Wagon")));

        let events = events.lock();
        assert!(events.iter().any(|p| p.phase == ScanPhase::Archives));
        assert_eq!(
            events.last(),
            Some(&ScanProgress {
                phase: ScanPhase::Complete,
                percent: 100
            })
        );
    }

    #[test]
    fn test_invalid_root() {
        let engine = TestEngine::new();
        let catalog = VehicleCatalog::new();
        let err = scanner(&engine, 1)
            .scan(
                &engine.assets().join("Missing"),
                &catalog,
                None,
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidRoot(_)));
    }

    proptest! {
        #[test]
        fn prop_priority_groups_are_ordered(
            picks in prop::collection::vec((0usize..3, "[a-z]{1,6}"), 0..20)
        ) {
            let dirs = ["RailVehicles", "Preload", "Scenery"];
            let names: Vec<String> = picks
                .iter()
                .map(|(dir, stem)| format!("{}/{}.bin", dirs[*dir], stem))
                .collect();

            let ordered = prioritized_entries(&names, "bin");
            prop_assert_eq!(ordered.len(), names.len());
            let priorities: Vec<usize> = ordered.iter().map(|n| entry_priority(n)).collect();
            prop_assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
