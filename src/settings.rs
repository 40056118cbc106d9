//! Runtime settings
//!
//! Settings are read from TOML. Every key is optional; missing keys keep
//! their defaults.
//!
//! ```toml
//! [di]
//! max_resolution_depth = 100
//!
//! [lifecycle]
//! catch_panics = true
//! forward_errors_to_component = true
//! diagnostics_level = "warn"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use halcyon_di::{DEFAULT_MAX_RESOLUTION_DEPTH, Injector, InjectorBuilder};
use halcyon_lifecycle::{LifecycleConfig, Severity};

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Settings errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
	/// The settings file could not be read.
	#[error("failed to read settings file {path}: {source}")]
	Io {
		/// Path of the settings file.
		path: PathBuf,
		/// Underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// The TOML document is malformed or has values of the wrong type.
	#[error("invalid settings: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value is out of range.
	#[error("invalid value for {key}: {message}")]
	Invalid {
		/// Dotted key, e.g. `di.max_resolution_depth`.
		key: &'static str,
		/// What is wrong with the value.
		message: String,
	},
}

/// `[di]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiSettings {
	/// Maximum nesting of provider resolution.
	pub max_resolution_depth: usize,
}

impl Default for DiSettings {
	fn default() -> Self {
		Self {
			max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
		}
	}
}

/// `[lifecycle]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleSettings {
	/// Catch panics at the plugin boundary.
	pub catch_panics: bool,
	/// Forward plugin failures to the component.
	pub forward_errors_to_component: bool,
	/// Minimum severity logged by the default diagnostics sink.
	pub diagnostics_level: Severity,
}

impl Default for LifecycleSettings {
	fn default() -> Self {
		let config = LifecycleConfig::default();
		Self {
			catch_panics: config.catch_panics,
			forward_errors_to_component: config.forward_errors_to_component,
			diagnostics_level: config.diagnostics_level,
		}
	}
}

/// Runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	/// Injector settings.
	pub di: DiSettings,
	/// Lifecycle settings.
	pub lifecycle: LifecycleSettings,
}

impl Settings {
	/// Parses and validates settings from a TOML document.
	///
	/// # Errors
	///
	/// [`SettingsError::Parse`] for malformed TOML, [`SettingsError::Invalid`]
	/// for out-of-range values.
	pub fn from_toml_str(source: &str) -> SettingsResult<Self> {
		let settings: Settings = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Loads settings from a TOML file. A missing file yields the defaults.
	///
	/// # Errors
	///
	/// [`SettingsError::Io`] if the file exists but cannot be read, otherwise
	/// as [`from_toml_str`](Self::from_toml_str).
	pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
		let path = path.as_ref();
		if !path.exists() {
			tracing::debug!(path = %path.display(), "settings file not found, using defaults");
			return Ok(Self::default());
		}

		let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let settings = Self::from_toml_str(&content)?;
		tracing::debug!(path = %path.display(), "settings loaded");
		Ok(settings)
	}

	/// Checks value ranges.
	///
	/// # Errors
	///
	/// [`SettingsError::Invalid`] if `di.max_resolution_depth` is zero.
	pub fn validate(&self) -> SettingsResult<()> {
		if self.di.max_resolution_depth == 0 {
			return Err(SettingsError::Invalid {
				key: "di.max_resolution_depth",
				message: "must be at least 1".to_string(),
			});
		}
		Ok(())
	}

	/// Configuration for a [`LifecycleManager`](halcyon_lifecycle::LifecycleManager).
	pub fn lifecycle_config(&self) -> LifecycleConfig {
		LifecycleConfig {
			catch_panics: self.lifecycle.catch_panics,
			forward_errors_to_component: self.lifecycle.forward_errors_to_component,
			diagnostics_level: self.lifecycle.diagnostics_level,
			max_resolution_depth: self.di.max_resolution_depth,
		}
	}

	/// Starts a root injector honoring the configured depth limit.
	pub fn injector_builder(&self) -> InjectorBuilder {
		Injector::builder().max_resolution_depth(self.di.max_resolution_depth)
	}
}

impl From<&Settings> for LifecycleConfig {
	fn from(settings: &Settings) -> Self {
		settings.lifecycle_config()
	}
}
