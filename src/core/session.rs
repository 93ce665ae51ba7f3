//! Session-scoped state: the configuration, the load cache, and the dataset
//! currently loaded.

use crate::core::cache::{LoadCache, SourceFingerprint};
use crate::core::config::AppConfig;
use crate::core::error::{LoadError, SessionError};
use crate::core::loader::{DatasetLoader, LoadOutcome, LoadReport};
use crate::core::record::RecordSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the current dataset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// The configured default dataset.
    Default(PathBuf),
    /// A file supplied by the user for this session.
    Upload(PathBuf),
}

impl DataSource {
    pub fn path(&self) -> &Path {
        match self {
            DataSource::Default(path) | DataSource::Upload(path) => path,
        }
    }
}

impl Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Default(path) => write!(f, "{} (default)", path.display()),
            DataSource::Upload(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub source: DataSource,
    pub fingerprint: SourceFingerprint,
    outcome: Arc<LoadOutcome>,
}

impl LoadedDataset {
    pub fn records(&self) -> &RecordSet {
        &self.outcome.records
    }

    pub fn report(&self) -> &LoadReport {
        &self.outcome.report
    }
}

pub struct Session {
    config: AppConfig,
    loader: DatasetLoader,
    cache: LoadCache,
    current: Option<LoadedDataset>,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self::with_cache(config, LoadCache::new())
    }

    /// Builds a session sharing an existing cache, so several sessions can
    /// reuse each other's loads.
    pub fn with_cache(config: AppConfig, cache: LoadCache) -> Self {
        let loader = DatasetLoader::new(config.loader.clone());
        Self {
            config,
            loader,
            cache,
            current: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &LoadCache {
        &self.cache
    }

    pub fn current(&self) -> Option<&LoadedDataset> {
        self.current.as_ref()
    }

    pub fn records(&self) -> Result<&RecordSet, SessionError> {
        self.current
            .as_ref()
            .map(LoadedDataset::records)
            .ok_or(SessionError::NothingLoaded)
    }

    pub fn last_report(&self) -> Result<&LoadReport, SessionError> {
        self.current
            .as_ref()
            .map(LoadedDataset::report)
            .ok_or(SessionError::NothingLoaded)
    }

    /// Loads `upload` when given, the configured default dataset otherwise.
    pub fn load(
        &mut self,
        upload: Option<&Path>,
        on_row: &dyn Fn(),
    ) -> Result<&LoadedDataset, SessionError> {
        let source = match upload {
            Some(path) => DataSource::Upload(path.to_path_buf()),
            None => DataSource::Default(PathBuf::from(&self.config.default_source_path)),
        };
        self.load_source(source, on_row)
    }

    pub fn load_default(&mut self) -> Result<&LoadedDataset, SessionError> {
        self.load(None, &|| ())
    }

    pub fn load_upload<P: AsRef<Path>>(&mut self, path: P) -> Result<&LoadedDataset, SessionError> {
        self.load(Some(path.as_ref()), &|| ())
    }

    fn load_source(
        &mut self,
        source: DataSource,
        on_row: &dyn Fn(),
    ) -> Result<&LoadedDataset, SessionError> {
        debug!(%source, "Loading dataset");
        let bytes = std::fs::read(source.path()).map_err(LoadError::from)?;
        let fingerprint = SourceFingerprint::of(&bytes);

        let outcome = match self.cache.get(&fingerprint) {
            Some(outcome) => outcome,
            None => {
                let outcome = Arc::new(self.loader.load_with_progress(bytes.as_slice(), on_row)?);
                self.cache.put(fingerprint.clone(), Arc::clone(&outcome));
                outcome
            }
        };

        // A new upload replaces the previous one for good.
        if let Some(previous) = self.current.take() {
            if matches!(previous.source, DataSource::Upload(_))
                && previous.fingerprint != fingerprint
            {
                self.cache.invalidate(&previous.fingerprint);
            }
        }

        info!(
            %source,
            %fingerprint,
            records = outcome.records.len(),
            "Dataset ready"
        );
        Ok(&*self.current.insert(LoadedDataset {
            source,
            fingerprint,
            outcome,
        }))
    }
}
