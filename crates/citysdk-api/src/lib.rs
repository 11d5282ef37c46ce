//! Typed client for the CitySDK tourism HTTP/JSON API.
//!
//! Every endpoint lives in its own module exposing an async `exec` function,
//! re-exported under the endpoint name (`auth::login`, `records::create`, ...).
//! Status handling is strict: anything other than `200 OK` is an error.

mod session;
mod types;

pub use session::SessionCookies;
pub use types::*;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

pub struct RequestConfig {
	pub client: reqwest::Client,
	/// Base URL of the API, always ending with a slash
	pub api_url: String,
	pub session: Option<SessionCookies>,
}

impl RequestConfig {
	pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
		let mut api_url = api_url.into();
		if !api_url.ends_with('/') {
			api_url.push('/');
		}

		Self {
			client,
			api_url,
			session: None,
		}
	}

	pub fn with_session(mut self, session: SessionCookies) -> Self {
		self.session = Some(session);
		self
	}

	pub fn auth_url(&self) -> String {
		format!("{}auth?format=json", self.api_url)
	}

	pub fn resource_url(&self, resource_type: &str) -> String {
		format!("{}{resource_type}s/", self.api_url)
	}

	pub fn categories_url(&self, resource_type: &str) -> String {
		format!(
			"{}categories?list={resource_type}&limit=0&format=json",
			self.resource_url(resource_type)
		)
	}
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("request to <url='{url}'> failed: {source}")]
	Request {
		url: String,
		#[source]
		source: reqwest::Error,
	},
	#[error("API authentication error: \"{0}\"")]
	Authentication(String),
	#[error("unexpected status {status} from <url='{url}'>: {body}")]
	Status {
		url: String,
		status: u16,
		body: String,
	},
	#[error("malformed response from <url='{url}'>: {reason}")]
	Decode { url: String, reason: String },
}

impl Error {
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// The server refused the session cookies we sent along
	pub fn is_session_rejected(&self) -> bool {
		matches!(
			self.status(),
			Some(status) if status == StatusCode::UNAUTHORIZED.as_u16()
				|| status == StatusCode::FORBIDDEN.as_u16()
		)
	}
}

trait WithSession {
	fn with_session(self, session: Option<&SessionCookies>) -> Self;
}

impl WithSession for reqwest::RequestBuilder {
	fn with_session(self, session: Option<&SessionCookies>) -> Self {
		match session.and_then(SessionCookies::header_value) {
			Some(cookie) => self.header(reqwest::header::COOKIE, cookie),
			None => self,
		}
	}
}

async fn send(url: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
	debug!(%url, "Sending request to CitySDK");

	request.send().await.map_err(|source| Error::Request {
		url: url.to_string(),
		source,
	})
}

/// Reads the whole body, failing on any status other than `200 OK`
async fn ok_body(url: &str, response: reqwest::Response) -> Result<String, Error> {
	let status = response.status();
	let body = response.text().await.map_err(|source| Error::Request {
		url: url.to_string(),
		source,
	})?;

	if status != StatusCode::OK {
		return Err(Error::Status {
			url: url.to_string(),
			status: status.as_u16(),
			body,
		});
	}

	Ok(body)
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, Error> {
	serde_json::from_str(body).map_err(|e| Error::Decode {
		url: url.to_string(),
		reason: e.to_string(),
	})
}

pub mod auth {
	use super::*;

	pub use login::exec as login;
	pub mod login {
		use super::*;

		pub async fn exec(
			config: &RequestConfig,
			username: &str,
			password: &str,
		) -> Result<SessionCookies, Error> {
			let url = config.auth_url();

			let response = send(
				&url,
				config
					.client
					.post(&url)
					.form(&[("username", username), ("password", password)]),
			)
			.await?;

			if response.status() != StatusCode::OK {
				let status = response.status().as_u16();
				let body = response.text().await.unwrap_or_default();

				return Err(match serde_json::from_str::<types::ErrorResponse>(&body) {
					Ok(rejection) => Error::Authentication(rejection.response_status.message),
					Err(_) => Error::Status { url, status, body },
				});
			}

			Ok(SessionCookies::from_response(&response))
		}
	}
}

pub mod categories {
	use super::*;

	pub use list::exec as list;
	pub mod list {
		use super::*;

		pub async fn exec(
			config: &RequestConfig,
			resource_type: &str,
		) -> Result<Vec<Category>, Error> {
			let url = config.categories_url(resource_type);

			let response = send(
				&url,
				config
					.client
					.get(&url)
					.with_session(config.session.as_ref()),
			)
			.await?;

			decode::<types::CategoryListing>(&url, &ok_body(&url, response).await?)
				.map(|listing| listing.categories)
		}
	}

	pub use create::exec as create;
	pub mod create {
		use super::*;

		/// Creates the category, answering with its new id.
		pub async fn exec(
			config: &RequestConfig,
			document: &CategoryDocument,
		) -> Result<RemoteId, Error> {
			let url = config.categories_url(&document.list);

			let response = send(
				&url,
				config
					.client
					.put(&url)
					.json(document)
					.with_session(config.session.as_ref()),
			)
			.await?;

			parse_created_id(&url, &ok_body(&url, response).await?)
		}

		/// The body is the bare id, usually JSON encoded, sometimes plain text
		pub(crate) fn parse_created_id(url: &str, body: &str) -> Result<RemoteId, Error> {
			let trimmed = body.trim();

			if let Ok(id) = serde_json::from_str::<RemoteId>(trimmed) {
				return Ok(id);
			}

			if trimmed.is_empty() || trimmed.contains(|c: char| c.is_whitespace() || c == '{') {
				return Err(Error::Decode {
					url: url.to_string(),
					reason: format!("expected a category id, got: {trimmed:?}"),
				});
			}

			Ok(RemoteId::new(trimmed))
		}
	}
}

pub mod records {
	use super::*;

	pub use create::exec as create;
	pub mod create {
		use super::*;

		/// PUT on the collection, answering with `{"id": ...}`
		pub async fn exec(config: &RequestConfig, document: &Document) -> Result<RemoteId, Error> {
			let url = config.resource_url(document.resource_type());

			let response = send(
				&url,
				config
					.client
					.put(&url)
					.json(document)
					.with_session(config.session.as_ref()),
			)
			.await?;

			decode::<types::Created>(&url, &ok_body(&url, response).await?).map(|created| created.id)
		}
	}

	pub use update::exec as update;
	pub mod update {
		use super::*;

		/// POST on the collection; the document must carry the remote id
		pub async fn exec(config: &RequestConfig, document: &Document) -> Result<(), Error> {
			let url = config.resource_url(document.resource_type());

			let response = send(
				&url,
				config
					.client
					.post(&url)
					.json(document)
					.with_session(config.session.as_ref()),
			)
			.await?;

			ok_body(&url, response).await.map(|_| ())
		}
	}

	pub use delete::exec as delete;
	pub mod delete {
		use super::*;

		use serde_json::json;

		pub async fn exec(
			config: &RequestConfig,
			resource_type: &str,
			id: &RemoteId,
		) -> Result<(), Error> {
			let url = config.resource_url(resource_type);

			let response = send(
				&url,
				config
					.client
					.delete(&url)
					.json(&json!({ "id": id }))
					.with_session(config.session.as_ref()),
			)
			.await?;

			ok_body(&url, response).await.map(|_| ())
		}
	}
}
