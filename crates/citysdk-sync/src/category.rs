use std::sync::Arc;

use citysdk_api::{CategoryDocument, RemoteId};
use tracing::{error, info, warn};

use crate::{
	config::{ConfigPatch, ConfigStore, SyncConfig},
	error::SyncError,
	remote::CitySdkRemote,
	session::SessionManager,
};

/// Finds, or creates, the remote category records are filed under and caches
/// its id in the synchronization config.
pub struct CategoryResolver {
	remote: Arc<dyn CitySdkRemote>,
	config_store: Arc<dyn ConfigStore>,
}

impl CategoryResolver {
	pub fn new(remote: Arc<dyn CitySdkRemote>, config_store: Arc<dyn ConfigStore>) -> Self {
		Self {
			remote,
			config_store,
		}
	}

	/// A cached id is only trusted if the fresh listing still has it under the
	/// configured label. Anything else is resolved again and persisted right
	/// away.
	pub async fn resolve(
		&self,
		layer: &str,
		config: &mut SyncConfig,
		session: &mut SessionManager,
	) -> Result<RemoteId, SyncError> {
		info!("Going to find CitySDK category ID");

		let remote = Arc::clone(&self.remote);
		let resource_type = config.resource_type.clone();
		let resource_type = resource_type.as_str();

		let categories = session
			.call(&*self.remote, config, |cookies| {
				let remote = Arc::clone(&remote);
				async move { remote.list_categories(&cookies, resource_type).await }
			})
			.await??;

		if let Some(cached) = &config.category_id {
			if categories
				.iter()
				.any(|category| &category.id == cached && category.is_labelled(&config.category))
			{
				info!(category_id = %cached, "Category already present in config");
				return Ok(cached.clone());
			}

			warn!(category_id = %cached, "Cached category is gone from CitySDK, resolving it again");
		}

		let category_id = if !categories
			.iter()
			.any(|category| category.is_labelled(&config.category))
		{
			info!(label = %config.category, "Creating new category in CitySDK");

			let document =
				CategoryDocument::new(&config.resource_type, &config.category, &config.lang);
			let document = &document;

			let id = session
				.call(&*self.remote, config, |cookies| {
					let remote = Arc::clone(&remote);
					async move { remote.create_category(&cookies, document).await }
				})
				.await??;

			info!(category_id = %id, "Category has been created");

			id
		} else {
			categories
				.into_iter()
				.find(|category| category.value == config.category)
				.map(|category| category.id)
				.ok_or_else(|| {
					let message = format!(
						"category \"{}\" was listed but no entry has it as value",
						config.category
					);
					error!("{message}");
					SyncError::Consistency(message)
				})?
		};

		self.config_store
			.update(layer, config, ConfigPatch::category(category_id.clone()))
			.await?;

		info!(%category_id, "Category ID has been stored in config");

		Ok(category_id)
	}
}
