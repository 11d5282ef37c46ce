use std::collections::BTreeMap;

use async_trait::async_trait;
use citysdk_api::RemoteId;
use tokio::sync::RwLock;

use crate::{error::SyncError, record::RecordId};

/// Link between a local record and the remote record it was pushed as.
///
/// At most one per local record; its absence means the record was never
/// pushed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
	pub record_id: RecordId,
	pub external_id: RemoteId,
}

#[async_trait]
pub trait MappingStore: Send + Sync {
	async fn get(&self, record_id: RecordId) -> Result<Option<RemoteId>, SyncError>;

	/// Fails if the record is already mapped
	async fn create(&self, record_id: RecordId, external_id: RemoteId) -> Result<(), SyncError>;

	async fn remove(&self, record_id: RecordId) -> Result<(), SyncError>;

	async fn list(&self) -> Result<Vec<ExternalIdentity>, SyncError>;
}

#[derive(Debug, Default)]
pub struct MemoryMappingStore {
	rows: RwLock<BTreeMap<RecordId, RemoteId>>,
}

impl MemoryMappingStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
	async fn get(&self, record_id: RecordId) -> Result<Option<RemoteId>, SyncError> {
		Ok(self.rows.read().await.get(&record_id).cloned())
	}

	async fn create(&self, record_id: RecordId, external_id: RemoteId) -> Result<(), SyncError> {
		let mut rows = self.rows.write().await;
		if let Some(existing) = rows.get(&record_id) {
			return Err(SyncError::MappingStore(format!(
				"record {record_id} is already mapped to {existing}"
			)));
		}

		rows.insert(record_id, external_id);

		Ok(())
	}

	async fn remove(&self, record_id: RecordId) -> Result<(), SyncError> {
		self.rows.write().await.remove(&record_id);
		Ok(())
	}

	async fn list(&self) -> Result<Vec<ExternalIdentity>, SyncError> {
		Ok(self
			.rows
			.read()
			.await
			.iter()
			.map(|(record_id, external_id)| ExternalIdentity {
				record_id: *record_id,
				external_id: external_id.clone(),
			})
			.collect())
	}
}
