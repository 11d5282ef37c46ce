use async_trait::async_trait;
use citysdk_api::{
	auth, categories, records, Category, CategoryDocument, Document, Error, RemoteId,
	RequestConfig, SessionCookies,
};

use crate::config::SyncConfig;

/// Everything the engine needs from the remote directory.
///
/// Answers are returned as-is so each operation can apply its own policy on
/// failures.
#[async_trait]
pub trait CitySdkRemote: Send + Sync {
	async fn login(&self, username: &str, password: &str) -> Result<SessionCookies, Error>;

	async fn list_categories(
		&self,
		session: &SessionCookies,
		resource_type: &str,
	) -> Result<Vec<Category>, Error>;

	async fn create_category(
		&self,
		session: &SessionCookies,
		document: &CategoryDocument,
	) -> Result<RemoteId, Error>;

	async fn create_record(
		&self,
		session: &SessionCookies,
		document: &Document,
	) -> Result<RemoteId, Error>;

	async fn update_record(&self, session: &SessionCookies, document: &Document)
		-> Result<(), Error>;

	async fn delete_record(
		&self,
		session: &SessionCookies,
		resource_type: &str,
		id: &RemoteId,
	) -> Result<(), Error>;
}

/// The real thing, over HTTP. Build it from the [`SyncConfig`] whose records
/// it sends, so the documents' `base` and the endpoints agree.
#[derive(Debug, Clone)]
pub struct HttpRemote {
	client: reqwest::Client,
	api_url: String,
}

impl HttpRemote {
	pub fn from_config(config: &SyncConfig) -> Self {
		Self::with_client(reqwest::Client::new(), config)
	}

	pub fn with_client(client: reqwest::Client, config: &SyncConfig) -> Self {
		Self {
			client,
			api_url: config.base_url(),
		}
	}

	pub fn api_url(&self) -> &str {
		&self.api_url
	}

	fn request_config(&self, session: Option<&SessionCookies>) -> RequestConfig {
		let config = RequestConfig::new(self.client.clone(), self.api_url.clone());

		match session {
			Some(session) => config.with_session(session.clone()),
			None => config,
		}
	}
}

#[async_trait]
impl CitySdkRemote for HttpRemote {
	async fn login(&self, username: &str, password: &str) -> Result<SessionCookies, Error> {
		auth::login(&self.request_config(None), username, password).await
	}

	async fn list_categories(
		&self,
		session: &SessionCookies,
		resource_type: &str,
	) -> Result<Vec<Category>, Error> {
		categories::list(&self.request_config(Some(session)), resource_type).await
	}

	async fn create_category(
		&self,
		session: &SessionCookies,
		document: &CategoryDocument,
	) -> Result<RemoteId, Error> {
		categories::create(&self.request_config(Some(session)), document).await
	}

	async fn create_record(
		&self,
		session: &SessionCookies,
		document: &Document,
	) -> Result<RemoteId, Error> {
		records::create(&self.request_config(Some(session)), document).await
	}

	async fn update_record(
		&self,
		session: &SessionCookies,
		document: &Document,
	) -> Result<(), Error> {
		records::update(&self.request_config(Some(session)), document).await
	}

	async fn delete_record(
		&self,
		session: &SessionCookies,
		resource_type: &str,
		id: &RemoteId,
	) -> Result<(), Error> {
		records::delete(&self.request_config(Some(session)), resource_type, id).await
	}
}
