//! Synchronization target configuration.
//!
//! The configuration is persisted per layer as a JSON blob. Keys keep the names
//! operators already use in that blob (`citysdk_url`, `citysdk_type`, ...);
//! anything we don't know about is carried through untouched.

use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};

use async_trait::async_trait;
use citysdk_api::{RemoteId, SessionCookies};
use serde::{Deserialize, Serialize};
use tokio::{fs, io};
use tracing::{debug, info};

use crate::error::{FileIOError, SyncError};

/// Shape of the local source, which decides the required keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
	Tourism,
	GeoJson,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Where the local records are read from
	#[serde(default)]
	pub url: String,
	/// Source property name for each local field, GeoJSON sources only
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub map: Option<BTreeMap<String, String>>,

	#[serde(default, rename = "citysdk_url")]
	pub api_url: String,
	/// Label of the remote category every record is filed under
	#[serde(default, rename = "citysdk_category")]
	pub category: String,
	/// Remote resource type: `poi`, `event` or `route`
	#[serde(default, rename = "citysdk_type")]
	pub resource_type: String,
	#[serde(default, rename = "citysdk_username")]
	pub username: String,
	#[serde(default, rename = "citysdk_password")]
	pub password: String,
	#[serde(default, rename = "citysdk_lang")]
	pub lang: String,
	#[serde(default, rename = "citysdk_term")]
	pub term: String,

	#[serde(
		default,
		rename = "citysdk_category_id",
		skip_serializing_if = "Option::is_none"
	)]
	pub category_id: Option<RemoteId>,
	#[serde(default, rename = "cookies", skip_serializing_if = "Option::is_none")]
	pub session_cookies: Option<SessionCookies>,

	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// State the engine resolves at runtime and writes back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
	pub category_id: Option<RemoteId>,
	pub session_cookies: Option<SessionCookies>,
}

impl ConfigPatch {
	pub fn category(id: RemoteId) -> Self {
		Self {
			category_id: Some(id),
			..Default::default()
		}
	}

	pub fn session(cookies: SessionCookies) -> Self {
		Self {
			session_cookies: Some(cookies),
			..Default::default()
		}
	}
}

impl SyncConfig {
	pub fn validate(&self) -> Result<(), SyncError> {
		for (key, value) in [
			("url", &self.url),
			("citysdk_url", &self.api_url),
			("citysdk_category", &self.category),
			("citysdk_type", &self.resource_type),
			("citysdk_username", &self.username),
			("citysdk_password", &self.password),
			("citysdk_lang", &self.lang),
			("citysdk_term", &self.term),
		] {
			if value.trim().is_empty() {
				return Err(SyncError::Config {
					key,
					reason: "required key is missing or blank".to_string(),
				});
			}
		}

		if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
			return Err(SyncError::Config {
				key: "citysdk_url",
				reason: format!("not an http(s) URL: {}", self.api_url),
			});
		}

		Ok(())
	}

	pub fn validate_for(&self, kind: SourceKind) -> Result<(), SyncError> {
		self.validate()?;

		if kind == SourceKind::GeoJson && self.map.is_none() {
			return Err(SyncError::Config {
				key: "map",
				reason: "GeoJSON sources need a field mapping table".to_string(),
			});
		}

		Ok(())
	}

	/// Base URL of the API with its trailing slash
	pub fn base_url(&self) -> String {
		if self.api_url.ends_with('/') {
			self.api_url.clone()
		} else {
			format!("{}/", self.api_url)
		}
	}

	pub fn resource_url(&self) -> String {
		format!("{}{}s/", self.base_url(), self.resource_type)
	}

	pub fn categories_url(&self) -> String {
		format!(
			"{}categories?list={}&limit=0&format=json",
			self.resource_url(),
			self.resource_type
		)
	}

	pub fn auth_url(&self) -> String {
		format!("{}auth?format=json", self.base_url())
	}

	pub fn apply(&mut self, patch: ConfigPatch) {
		if let Some(category_id) = patch.category_id {
			self.category_id = Some(category_id);
		}

		if let Some(cookies) = patch.session_cookies {
			self.session_cookies = Some(cookies);
		}
	}
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
	async fn load(&self, layer: &str) -> Result<SyncConfig, SyncError>;

	/// Must replace the stored blob atomically
	async fn save(&self, layer: &str, config: &SyncConfig) -> Result<(), SyncError>;

	async fn update(
		&self,
		layer: &str,
		config: &mut SyncConfig,
		patch: ConfigPatch,
	) -> Result<(), SyncError> {
		config.apply(patch);
		self.save(layer, config).await
	}
}

/// Keeps one pretty printed `<layer>.json` per layer inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileConfigStore {
	dir: PathBuf,
}

impl JsonFileConfigStore {
	pub fn new(dir: impl AsRef<Path>) -> Self {
		Self {
			dir: dir.as_ref().to_path_buf(),
		}
	}

	fn path_for(&self, layer: &str) -> Result<PathBuf, SyncError> {
		if layer.is_empty()
			|| layer.starts_with('.')
			|| layer.contains(|c: char| c == '/' || c == '\\')
		{
			return Err(SyncError::Config {
				key: "layer",
				reason: format!("unusable layer name: {layer:?}"),
			});
		}

		Ok(self.dir.join(format!("{layer}.json")))
	}
}

#[async_trait]
impl ConfigStore for JsonFileConfigStore {
	async fn load(&self, layer: &str) -> Result<SyncConfig, SyncError> {
		let path = self.path_for(layer)?;

		let json = match fs::read_to_string(&path).await {
			Ok(json) => json,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(SyncError::Config {
					key: "layer",
					reason: format!("no synchronization config for layer {layer:?}"),
				})
			}
			Err(e) => return Err(FileIOError::from((&path, e, "read sync config")).into()),
		};

		debug!(?path, "Loaded synchronization config");

		serde_json::from_str(&json).map_err(Into::into)
	}

	async fn save(&self, layer: &str, config: &SyncConfig) -> Result<(), SyncError> {
		let path = self.path_for(layer)?;
		let tmp_path = path.with_extension("json.tmp");

		fs::create_dir_all(&self.dir)
			.await
			.map_err(|e| FileIOError::from((&self.dir, e, "create config directory")))?;

		fs::write(&tmp_path, serde_json::to_vec_pretty(config)?)
			.await
			.map_err(|e| FileIOError::from((&tmp_path, e, "write sync config")))?;

		fs::rename(&tmp_path, &path)
			.await
			.map_err(|e| FileIOError::from((&path, e, "replace sync config")))?;

		info!(?path, "Saved synchronization config");

		Ok(())
	}
}
