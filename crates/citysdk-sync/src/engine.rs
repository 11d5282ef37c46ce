use std::{
	collections::{BTreeMap, HashSet},
	future::Future,
	sync::Arc,
};

use citysdk_api::{Document, RemoteId, SessionCookies};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
	category::CategoryResolver,
	config::{ConfigPatch, ConfigStore, SyncConfig},
	error::SyncError,
	formatter::RecordFormatter,
	mapping::MappingStore,
	record::{LocalRecord, RecordId},
	remote::CitySdkRemote,
	session::SessionManager,
};

/// What happened to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
	Added,
	Updated,
	/// The remote refused to create the record; nothing changed locally
	Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRecord {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub record_id: Option<RecordId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub external_id: Option<RemoteId>,
	pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
	pub run_id: Uuid,
	pub added: usize,
	pub updated: usize,
	pub deleted: usize,
	pub failed: Vec<FailedRecord>,
}

/// Pushes the records of one layer to CitySDK.
///
/// Not meant to run concurrently with another engine on the same layer: the
/// cached category id and cookies are read, patched and written back without
/// any locking.
pub struct SyncEngine<F> {
	layer: String,
	config: SyncConfig,
	formatter: F,
	remote: Arc<dyn CitySdkRemote>,
	config_store: Arc<dyn ConfigStore>,
	mappings: Arc<dyn MappingStore>,
	session: SessionManager,
	categories: CategoryResolver,
}

impl<F: RecordFormatter> SyncEngine<F> {
	pub fn new(
		layer: impl Into<String>,
		config: SyncConfig,
		formatter: F,
		remote: Arc<dyn CitySdkRemote>,
		config_store: Arc<dyn ConfigStore>,
		mappings: Arc<dyn MappingStore>,
	) -> Self {
		Self {
			layer: layer.into(),
			config,
			formatter,
			categories: CategoryResolver::new(Arc::clone(&remote), Arc::clone(&config_store)),
			remote,
			config_store,
			mappings,
			session: SessionManager::new(),
		}
	}

	/// Reads the layer's config from the store before building the engine
	pub async fn load(
		layer: impl Into<String>,
		formatter: F,
		remote: Arc<dyn CitySdkRemote>,
		config_store: Arc<dyn ConfigStore>,
		mappings: Arc<dyn MappingStore>,
	) -> Result<Self, SyncError> {
		let layer = layer.into();
		let config = config_store.load(&layer).await?;

		Ok(Self::new(
			layer,
			config,
			formatter,
			remote,
			config_store,
			mappings,
		))
	}

	pub fn layer(&self) -> &str {
		&self.layer
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn session(&self) -> &SessionManager {
		&self.session
	}

	pub async fn ensure_session(&mut self, force: bool) -> Result<SessionCookies, SyncError> {
		self.session
			.ensure_session(&*self.remote, &self.config, force)
			.await
	}

	/// Checks the configuration and that its credentials are accepted, meant
	/// to run when an operator saves the synchronization target.
	#[instrument(skip_all, fields(layer = %self.layer), err)]
	pub async fn validate(&mut self) -> Result<(), SyncError> {
		self.config.validate_for(self.formatter.source_kind())?;
		self.ensure_session(true).await.map(|_| ())
	}

	/// Runs right after the synchronization target has been saved.
	#[instrument(skip_all, fields(layer = %self.layer), err)]
	pub async fn after_config_saved(&mut self) -> Result<RemoteId, SyncError> {
		self.resolve_category().await
	}

	/// Logs in once for the whole run and caches the cookies in the config.
	#[instrument(skip_all, fields(layer = %self.layer), err)]
	pub async fn before_start(&mut self) -> Result<(), SyncError> {
		let cookies = self.ensure_session(true).await?;

		self.config_store
			.update(&self.layer, &mut self.config, ConfigPatch::session(cookies))
			.await
	}

	pub async fn resolve_category(&mut self) -> Result<RemoteId, SyncError> {
		self.categories
			.resolve(&self.layer, &mut self.config, &mut self.session)
			.await
	}

	/// Creates the remote record and maps it; `false` when the remote refused.
	pub async fn add(&mut self, record: &LocalRecord) -> Result<bool, SyncError> {
		self.add_record(record)
			.await
			.map(|outcome| outcome == SyncOutcome::Added)
	}

	/// Updates the mapped remote record, falling back to [`Self::add`] when
	/// the record turns out not to be mapped.
	pub async fn change(&mut self, record: &LocalRecord) -> Result<bool, SyncError> {
		self.change_record(record)
			.await
			.map(|outcome| outcome != SyncOutcome::Rejected)
	}

	/// Deletes a remote record. Removing the mapping is up to the caller once
	/// this returns `true`.
	#[instrument(skip_all, fields(layer = %self.layer, %external_id), err)]
	pub async fn delete(&mut self, external_id: &RemoteId) -> Result<bool, SyncError> {
		let remote = Arc::clone(&self.remote);
		let resource_type = self.config.resource_type.clone();
		let resource_type = resource_type.as_str();

		match self
			.call_remote(|session| {
				let remote = Arc::clone(&remote);
				async move {
					remote
						.delete_record(&session, resource_type, external_id)
						.await
				}
			})
			.await?
		{
			Ok(()) => {
				info!("Deleted a record through the CitySDK HTTP API");
				Ok(true)
			}
			Err(e) => {
				info!("Failed to delete a record through the CitySDK HTTP API: {e}");
				Ok(false)
			}
		}
	}

	/// Adds records without a mapping, changes the others.
	pub async fn sync(&mut self, record: &LocalRecord) -> Result<SyncOutcome, SyncError> {
		if self.mappings.get(record.id).await?.is_some() {
			self.change_record(record).await
		} else {
			self.add_record(record).await
		}
	}

	/// Full run: authentication, first time category resolution, then one
	/// round trip per record. Remote records whose local record is gone are
	/// deleted and unmapped.
	///
	/// Only fatal errors abort the run; anything else is recorded in the
	/// summary and the next record is processed.
	#[instrument(skip_all, fields(layer = %self.layer, run_id = tracing::field::Empty), err)]
	pub async fn run(&mut self, records: &[LocalRecord]) -> Result<RunSummary, SyncError> {
		let mut summary = RunSummary {
			run_id: Uuid::new_v4(),
			..Default::default()
		};
		tracing::Span::current().record("run_id", tracing::field::display(summary.run_id));

		self.config.validate_for(self.formatter.source_kind())?;
		self.before_start().await?;

		if self.config.category_id.is_none() {
			self.resolve_category().await?;
		}

		let mapped = self
			.mappings
			.list()
			.await?
			.into_iter()
			.map(|identity| (identity.record_id, identity.external_id))
			.collect::<BTreeMap<_, _>>();

		for record in records {
			// the mapping may have been written earlier in this run
			match self.sync(record).await {
				Ok(SyncOutcome::Added) => summary.added += 1,
				Ok(SyncOutcome::Updated) => summary.updated += 1,
				Ok(SyncOutcome::Rejected) => summary.failed.push(FailedRecord {
					record_id: Some(record.id),
					external_id: None,
					reason: "rejected by CitySDK".to_string(),
				}),
				Err(e) if e.is_fatal() => {
					error!(record_id = record.id, "Aborting synchronization: {e:#}");
					return Err(e);
				}
				Err(e) => {
					warn!(record_id = record.id, "Skipping record: {e:#}");
					summary.failed.push(FailedRecord {
						record_id: Some(record.id),
						external_id: None,
						reason: e.to_string(),
					});
				}
			}
		}

		let present = records
			.iter()
			.map(|record| record.id)
			.collect::<HashSet<_>>();

		for (record_id, external_id) in mapped {
			if present.contains(&record_id) {
				continue;
			}

			match self.delete(&external_id).await {
				Ok(true) => {
					self.mappings.remove(record_id).await?;
					summary.deleted += 1;
				}
				Ok(false) => summary.failed.push(FailedRecord {
					record_id: Some(record_id),
					external_id: Some(external_id),
					reason: "deletion refused by CitySDK".to_string(),
				}),
				Err(e) if e.is_fatal() => return Err(e),
				Err(e) => summary.failed.push(FailedRecord {
					record_id: Some(record_id),
					external_id: Some(external_id),
					reason: e.to_string(),
				}),
			}
		}

		info!(
			added = summary.added,
			updated = summary.updated,
			deleted = summary.deleted,
			failed = summary.failed.len(),
			"Synchronization finished"
		);

		Ok(summary)
	}

	#[instrument(skip_all, fields(layer = %self.layer, record_id = record.id), err)]
	async fn add_record(&mut self, record: &LocalRecord) -> Result<SyncOutcome, SyncError> {
		let document = self.format(record)?;
		let document = &document;
		let remote = Arc::clone(&self.remote);

		match self
			.call_remote(|session| {
				let remote = Arc::clone(&remote);
				async move { remote.create_record(&session, document).await }
			})
			.await?
		{
			Ok(external_id) => {
				self.mappings.create(record.id, external_id.clone()).await?;
				info!(%external_id, "New record \"{}\" saved in CitySDK", record.name);
				Ok(SyncOutcome::Added)
			}
			Err(e @ citysdk_api::Error::Decode { .. }) => Err(SyncError::Parse(e.to_string())),
			Err(e) => {
				error!("ERROR while creating \"{}\": {e}", record.name);
				Ok(SyncOutcome::Rejected)
			}
		}
	}

	#[instrument(skip_all, fields(layer = %self.layer, record_id = record.id), err)]
	async fn change_record(&mut self, record: &LocalRecord) -> Result<SyncOutcome, SyncError> {
		let Some(external_id) = self.mappings.get(record.id).await? else {
			debug!("Record is not mapped anymore, creating it instead");
			return self.add_record(record).await;
		};

		let document = self.format(record)?.with_id(external_id);
		let document = &document;
		let remote = Arc::clone(&self.remote);

		match self
			.call_remote(|session| {
				let remote = Arc::clone(&remote);
				async move { remote.update_record(&session, document).await }
			})
			.await?
		{
			Ok(()) => {
				info!("Updated record \"{}\" through the CitySDK HTTP API", record.name);
				Ok(SyncOutcome::Updated)
			}
			Err(e) => {
				let message = format!(
					"ERROR while updating record \"{}\" through CitySDK API: {e}",
					record.name
				);
				error!("{message}");
				Err(SyncError::RemoteApi(message))
			}
		}
	}

	fn format(&self, record: &LocalRecord) -> Result<Document, SyncError> {
		let category_id = self
			.config
			.category_id
			.as_ref()
			.ok_or_else(|| SyncError::Config {
				key: "citysdk_category_id",
				reason: "category not resolved yet".to_string(),
			})?;

		self.formatter.format(record, &self.config, category_id)
	}

	async fn call_remote<T, Fut>(
		&mut self,
		call: impl Fn(SessionCookies) -> Fut,
	) -> Result<Result<T, citysdk_api::Error>, SyncError>
	where
		Fut: Future<Output = Result<T, citysdk_api::Error>>,
	{
		self.session.call(&*self.remote, &self.config, call).await
	}
}
