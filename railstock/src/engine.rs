//! The engine facade.
//!
//! [`AssetEngine`] owns one session cache and wires the storage resolver,
//! vehicle resolver and scanner together from an [`EngineConfig`]. Hosts
//! call [`AssetEngine::begin_session`] whenever a new editing session
//! starts, since archives on disk may have changed in between.

use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::blueprint::{
    BlueprintDecoder, DisplayNamePicker, LanguagePreferencePicker, XmlBlueprintDecoder,
};
use crate::catalog::{CatalogScanner, ScanError, ScanProgressCallback, ScanReport, VehicleCatalog};
use crate::config::EngineConfig;
use crate::error::ResolveResult;
use crate::identity::BlueprintIdentity;
use crate::storage::{
    ArchiveReader, Availability, LocationHint, SessionCache, StorageResolver, ZipArchiveReader,
};
use crate::vehicle::{
    ConsistMember, CsvNumberingLoader, NumberingListLoader, ResolutionContext, VehicleRecord,
    VehicleResolver,
};

/// External collaborators the engine delegates to.
///
/// `numbering: None` selects the CSV loader reading through the engine's own
/// storage resolver.
#[derive(Clone)]
pub struct Collaborators {
    pub decoder: Arc<dyn BlueprintDecoder>,
    pub archives: Arc<dyn ArchiveReader>,
    pub names: Arc<dyn DisplayNamePicker>,
    pub numbering: Option<Arc<dyn NumberingListLoader>>,
}

impl Collaborators {
    /// The bundled implementations, with display languages from `config`.
    pub fn for_config(config: &EngineConfig) -> Self {
        Self {
            decoder: Arc::new(XmlBlueprintDecoder::new()),
            archives: Arc::new(ZipArchiveReader::new()),
            names: Arc::new(LanguagePreferencePicker::new(
                config.display_languages.iter().cloned(),
            )),
            numbering: None,
        }
    }
}

/// Vehicle asset resolution for one assets root.
pub struct AssetEngine {
    config: EngineConfig,
    cache: Arc<SessionCache>,
    storage: Arc<StorageResolver>,
    vehicles: Arc<VehicleResolver>,
    scanner: CatalogScanner,
}

impl AssetEngine {
    /// Create an engine with the bundled collaborators.
    pub fn new(config: EngineConfig) -> Result<Self, ScanError> {
        let collaborators = Collaborators::for_config(&config);
        Self::with_collaborators(config, collaborators)
    }

    pub fn with_collaborators(
        config: EngineConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ScanError> {
        let cache = Arc::new(SessionCache::new());
        let storage = Arc::new(StorageResolver::from_config(
            &config,
            Arc::clone(&cache),
            collaborators.archives,
        ));
        let numbering: Arc<dyn NumberingListLoader> = match collaborators.numbering {
            Some(loader) => loader,
            None => Arc::new(CsvNumberingLoader::new(Arc::clone(&storage))),
        };
        let vehicles = Arc::new(
            VehicleResolver::new(
                Arc::clone(&storage),
                collaborators.decoder,
                collaborators.names,
                numbering,
            )
            .with_max_preload_depth(config.max_preload_depth),
        );
        let scanner = CatalogScanner::from_config(Arc::clone(&vehicles), &config)?;

        Ok(Self {
            config,
            cache,
            storage,
            vehicles,
            scanner,
        })
    }

    /// Forget cached archives and lookups and remove stale extractions.
    pub fn begin_session(&self) -> io::Result<()> {
        let stats = self.cache.stats();
        self.cache.reset();
        self.storage.clear_temp_dir()?;
        info!(
            archives = stats.cached_archives,
            lookups = stats.cached_lookups,
            "Started new asset session"
        );
        Ok(())
    }

    /// Locate a storage-relative resource.
    pub fn locate(&self, relative_path: &str) -> Availability {
        self.storage.locate(relative_path, &LocationHint::Unknown)
    }

    /// Read the bytes of a located resource.
    pub fn extract(&self, availability: &Availability) -> ResolveResult<Vec<u8>> {
        self.storage.extract(availability)
    }

    pub fn resolve_vehicle(&self, bin_path: &str) -> ResolveResult<VehicleRecord> {
        self.vehicles.resolve(bin_path, &ResolutionContext::new())
    }

    pub fn resolve_identity(&self, identity: &BlueprintIdentity) -> ResolveResult<VehicleRecord> {
        self.vehicles.resolve_identity(identity, &ResolutionContext::new())
    }

    /// Flatten a preload the user picked; any failing entry is an error.
    pub fn preload_vehicles(&self, preload: &VehicleRecord) -> ResolveResult<Vec<ConsistMember>> {
        self.vehicles.preload_vehicles(preload)
    }

    /// Scan `root` (a directory under the assets root) into `catalog`.
    pub fn scan(
        &self,
        root: &Path,
        catalog: &VehicleCatalog,
        progress: Option<ScanProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        self.scanner.scan(root, catalog, progress, cancel)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    pub fn storage(&self) -> &Arc<StorageResolver> {
        &self.storage
    }

    pub fn vehicles(&self) -> &Arc<VehicleResolver> {
        &self.vehicles
    }

    pub fn scanner(&self) -> &CatalogScanner {
        &self.scanner
    }
}
