//! # Config Loader
//!
//! Transform configuration loading.
//!
//! Responsibilities:
//! - Parse the per-sensor transform file (JSON, or TOML of the same shape)
//! - Validate each entry on its own, rejecting malformed ones
//! - Produce `TransformEntry` values and the static transforms to broadcast
//! - Fall back to one synthetic default entry (serial 0) without a file
//!
//! # Example
//!
//! ```no_run
//! use config_loader::TransformConfigLoader;
//! use std::path::Path;
//!
//! let loaded = TransformConfigLoader::load(Some(Path::new("transforms.json")), "cepton").unwrap();
//! for entry in loaded.entries.values() {
//!     println!("{} -> {}", entry.serial_number, entry.frame_id);
//! }
//! ```

mod parser;
mod rotation;
mod validator;

pub use parser::ConfigFormat;
pub use rotation::to_quaternion;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use contracts::{
    ContractError, Rotation, SerialNumber, StaticTransform, TransformEntry, DEFAULT_SERIAL_NUMBER,
};
use tracing::{debug, error, info, instrument};

/// Parent frame used when none is configured
pub const DEFAULT_PARENT_FRAME_ID: &str = "cepton";

/// Prefix of generated sensor frame ids (`<prefix>_<serial>`)
pub const FRAME_PREFIX: &str = "cepton";

/// Frame id of the default route
pub const DEFAULT_FRAME_ID: &str = "cepton_0";

/// Where the loaded transforms came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No file supplied; one synthetic default entry
    Default,
    /// Loaded from a file
    File(PathBuf),
    /// Loaded from an in-memory string
    Inline,
}

/// An entry that failed validation
#[derive(Debug)]
pub struct RejectedEntry {
    /// Key as written in the file
    pub key: String,
    pub error: ContractError,
}

/// Loader output
#[derive(Debug)]
pub struct LoadedTransforms {
    pub source: ConfigSource,

    /// Accepted entries by serial number
    pub entries: BTreeMap<SerialNumber, TransformEntry>,

    /// One parent -> sensor transform per accepted entry
    pub transforms: Vec<StaticTransform>,

    /// Entries skipped because they were malformed
    pub rejected: Vec<RejectedEntry>,
}

impl LoadedTransforms {
    pub fn is_default(&self) -> bool {
        self.source == ConfigSource::Default
    }
}

/// Transform configuration loader
///
/// Provides static methods to load transforms from files or strings.
pub struct TransformConfigLoader;

impl TransformConfigLoader {
    /// Load from an optional path
    ///
    /// `None` or an empty path yields the synthetic default entry.
    ///
    /// # Errors
    /// - File read failure
    /// - File is not a JSON/TOML object
    pub fn load(
        path: Option<&Path>,
        parent_frame_id: &str,
    ) -> Result<LoadedTransforms, ContractError> {
        match path {
            Some(path) if !path.as_os_str().is_empty() => {
                Self::load_from_path(path, parent_frame_id)
            }
            _ => Ok(Self::default_transforms(parent_frame_id)),
        }
    }

    /// Load from file path
    ///
    /// `.toml` files are parsed as TOML, everything else as JSON.
    #[instrument(
        name = "transforms_load_from_path",
        skip_all,
        fields(path = %path.display())
    )]
    pub fn load_from_path(
        path: &Path,
        parent_frame_id: &str,
    ) -> Result<LoadedTransforms, ContractError> {
        let format = ConfigFormat::from_extension(path.extension().and_then(|e| e.to_str()));
        let content = std::fs::read_to_string(path)?;
        let mut loaded = Self::load_from_str(&content, format, parent_frame_id)?;
        loaded.source = ConfigSource::File(path.to_path_buf());
        Ok(loaded)
    }

    /// Load from string
    ///
    /// # Errors
    /// Only whole-document parse failures; malformed entries are collected in
    /// `rejected` instead.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
        parent_frame_id: &str,
    ) -> Result<LoadedTransforms, ContractError> {
        let raw = parser::parse(content, format)?;

        let mut entries = BTreeMap::new();
        let mut rejected = Vec::new();

        for (key, value) in &raw {
            match validator::validate_entry(key, value, FRAME_PREFIX) {
                Ok(entry) => {
                    debug!(
                        serial_number = entry.serial_number,
                        frame_id = %entry.frame_id,
                        topic_name = ?entry.topic_name,
                        "transform entry accepted"
                    );
                    entries.insert(entry.serial_number, entry);
                }
                Err(e) => {
                    error!(key = %key, error = %e, "malformed transform entry, skipping");
                    rejected.push(RejectedEntry {
                        key: key.clone(),
                        error: e,
                    });
                }
            }
        }

        let transforms = entries
            .values()
            .map(|entry| static_transform(parent_frame_id, entry))
            .collect();

        info!(
            accepted = entries.len(),
            rejected = rejected.len(),
            "transform configuration loaded"
        );

        Ok(LoadedTransforms {
            source: ConfigSource::Inline,
            entries,
            transforms,
            rejected,
        })
    }

    /// Synthetic default: serial 0, identity rotation, zero translation
    pub fn default_transforms(parent_frame_id: &str) -> LoadedTransforms {
        let entry = TransformEntry {
            serial_number: DEFAULT_SERIAL_NUMBER,
            frame_id: DEFAULT_FRAME_ID.to_string(),
            translation: [0.0; 3],
            rotation: Rotation::default(),
            topic_name: None,
        };
        let transforms = vec![static_transform(parent_frame_id, &entry)];

        info!("no transform configuration supplied, using default route");

        LoadedTransforms {
            source: ConfigSource::Default,
            entries: BTreeMap::from([(DEFAULT_SERIAL_NUMBER, entry)]),
            transforms,
            rejected: Vec::new(),
        }
    }
}

/// Build the parent -> sensor transform for an entry
pub fn static_transform(parent_frame_id: &str, entry: &TransformEntry) -> StaticTransform {
    StaticTransform {
        frame_id: parent_frame_id.to_string(),
        child_frame_id: entry.frame_id.clone(),
        translation: entry.translation,
        rotation: to_quaternion(&entry.rotation),
    }
}
