//! Application configuration.
//!
//! Loaded from `laundry-watch.toml` (or the path given with `--config`).
//! Every section is optional. Credentials never live in the file: they are
//! read from the environment when the store is built.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::lifecycle::{LifecycleError, ScreenshotLayout};
use crate::pipeline::reader::RecordReader;
use crate::pipeline::recognition::{OcrEngine, RecognitionError, TesseractCli};
use crate::pipeline::runner::BatchRunner;
use crate::pipeline::tokens::{TokenClassifier, Vocabulary, VocabularyConfig, VocabularyError};
use crate::pipeline::validation::{RecordValidator, ValidationConfig};
use crate::store::{SqliteStore, StoreError, SupabaseSettings, SupabaseStore, UsageStore};

/// Application-level constants
pub const APP_NAME: &str = "laundry-watch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File looked up in the working directory and its parents.
pub const CONFIG_FILE_NAME: &str = "laundry-watch.toml";

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "SUPABASE_KEY";
pub const ENV_SUPABASE_USER: &str = "SUPABASE_USER";
pub const ENV_SUPABASE_PASSWORD: &str = "SUPABASE_USER_PASSWORD";
pub const ENV_TESSDATA_PREFIX: &str = "TESSDATA_PREFIX";

/// Interval for `watch` when none is given on the command line.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Used by the bundled engine when neither the file nor `TESSDATA_PREFIX` names one.
#[cfg(feature = "ocr")]
const DEFAULT_TESSDATA_DIR: &str = "/usr/share/tesseract-ocr/5/tessdata";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,laundry_watch=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot determine working directory: {0}")]
    WorkingDir(std::io::Error),

    #[error("Invalid vocabulary: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("OCR backend '{0}' is not available in this build (enable the `ocr` feature)")]
    BackendUnavailable(&'static str),

    #[error("OCR setup failed: {0}")]
    Ocr(#[from] RecognitionError),

    #[error("Screenshot directories: {0}")]
    Layout(#[from] LifecycleError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub screenshots: ScreenshotsConfig,
    pub ocr: OcrConfig,
    pub vocabulary: VocabularyConfig,
    pub validation: ValidationConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotsConfig {
    pub pending_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub failed_dir: PathBuf,
}

impl Default for ScreenshotsConfig {
    fn default() -> Self {
        let root = Path::new("screenshots");
        Self {
            pending_dir: root.join("landing_area"),
            processed_dir: root.join("processed"),
            failed_dir: root.join("failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackend {
    /// Runs the `tesseract` executable and parses its TSV output.
    TesseractCli,
    /// Links libtesseract. Requires the `ocr` feature.
    Bundled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackend,
    pub binary: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language codes joined with `+`.
    pub languages: String,
    pub page_segmentation_mode: Option<u8>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::TesseractCli,
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
            languages: "deu".into(),
            page_segmentation_mode: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Sqlite,
    Supabase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: PathBuf,
    /// Overridden by `SUPABASE_URL` when set.
    pub supabase_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: PathBuf::from("laundry-watch.db"),
            supabase_url: None,
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Search for `laundry-watch.toml` from `start` upwards.
    pub fn discover_from(start: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                let config = Self::from_toml_file(&candidate)?;
                return Ok(Some((candidate, config)));
            }
        }
        Ok(None)
    }

    pub fn discover() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::discover_from(&cwd)
    }

    /// Explicit path, else discovery, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            tracing::info!(path = %path.display(), "Loading configuration");
            return Self::from_toml_file(path);
        }
        match Self::discover()? {
            Some((path, config)) => {
                tracing::info!(path = %path.display(), "Loading configuration");
                Ok(config)
            }
            None => {
                tracing::info!("No {CONFIG_FILE_NAME} found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn layout(&self) -> ScreenshotLayout {
        ScreenshotLayout::new(
            self.screenshots.pending_dir.clone(),
            self.screenshots.processed_dir.clone(),
            self.screenshots.failed_dir.clone(),
        )
    }

    pub fn tessdata_dir(&self, env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        env(ENV_TESSDATA_PREFIX)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.ocr.tessdata_dir.clone())
    }

    pub fn build_engine(&self) -> Result<Box<dyn OcrEngine>, ConfigError> {
        let tessdata = self.tessdata_dir(read_env);
        match self.ocr.backend {
            OcrBackend::TesseractCli => Ok(Box::new(
                TesseractCli::new(self.ocr.binary.clone(), &self.ocr.languages)
                    .with_tessdata_dir(tessdata)
                    .with_page_segmentation_mode(self.ocr.page_segmentation_mode),
            )),
            #[cfg(feature = "ocr")]
            OcrBackend::Bundled => {
                let dir = tessdata.unwrap_or_else(|| PathBuf::from(DEFAULT_TESSDATA_DIR));
                Ok(Box::new(crate::pipeline::recognition::BundledTesseract::new(
                    &dir,
                    &self.ocr.languages,
                )?))
            }
            #[cfg(not(feature = "ocr"))]
            OcrBackend::Bundled => Err(ConfigError::BackendUnavailable("bundled")),
        }
    }

    pub fn build_reader(&self) -> Result<RecordReader, ConfigError> {
        let vocabulary = Vocabulary::from_config(&self.vocabulary)?;
        Ok(RecordReader::new(
            self.build_engine()?,
            TokenClassifier::new(vocabulary),
            RecordValidator::new(self.validation.clone()),
        ))
    }

    pub fn supabase_settings(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<SupabaseSettings, ConfigError> {
        let require = |key: &'static str| env(key).filter(|v| !v.is_empty()).ok_or(ConfigError::MissingEnv(key));

        let url = match env(ENV_SUPABASE_URL).filter(|v| !v.is_empty()) {
            Some(url) => url,
            None => self
                .store
                .supabase_url
                .clone()
                .ok_or(ConfigError::MissingEnv(ENV_SUPABASE_URL))?,
        };

        Ok(SupabaseSettings {
            url,
            api_key: require(ENV_SUPABASE_KEY)?,
            email: require(ENV_SUPABASE_USER)?,
            password: require(ENV_SUPABASE_PASSWORD)?,
            timeout_secs: self.store.timeout_secs,
        })
    }

    /// Open the configured store. Supabase signs in here.
    pub fn build_store(&self) -> Result<Box<dyn UsageStore>, ConfigError> {
        match self.store.backend {
            StoreBackend::Sqlite => Ok(Box::new(SqliteStore::open(&self.store.sqlite_path)?)),
            StoreBackend::Supabase => {
                let settings = self.supabase_settings(read_env)?;
                Ok(Box::new(SupabaseStore::sign_in(&settings)?))
            }
        }
    }

    /// Wire reader, store and layout into a runner and make sure the
    /// screenshot directories exist.
    pub fn build_runner(&self) -> Result<BatchRunner, ConfigError> {
        let layout = self.layout();
        layout.ensure_dirs()?;
        let reader = self.build_reader()?;
        let store = self.build_store()?;
        Ok(BatchRunner::new(reader, store, layout))
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
