use std::future::Future;

use citysdk_api::SessionCookies;
use tracing::{info, warn};

use crate::{config::SyncConfig, error::SyncError, remote::CitySdkRemote};

/// Keeps the session cookies for the current run.
///
/// Never persists anything: whoever wants the cookies cached in the
/// configuration does it explicitly, so a run refreshing an expired session
/// does not rewrite the config blob for every record.
#[derive(Debug, Default)]
pub struct SessionManager {
	current: Option<SessionCookies>,
}

impl SessionManager {
	pub fn new() -> Self {
		Self::default()
	}

	/// Cookies obtained during this run, if any
	pub fn current(&self) -> Option<&SessionCookies> {
		self.current.as_ref()
	}

	/// Returns usable cookies, logging in only when nothing is cached or
	/// `force` is set.
	pub async fn ensure_session(
		&mut self,
		remote: &dyn CitySdkRemote,
		config: &SyncConfig,
		force: bool,
	) -> Result<SessionCookies, SyncError> {
		if !force {
			if let Some(cookies) = self.current.as_ref().or(config.session_cookies.as_ref()) {
				return Ok(cookies.clone());
			}
		}

		info!("Authenticating to CitySDK");

		let cookies = remote
			.login(&config.username, &config.password)
			.await
			.map_err(|e| match e {
				citysdk_api::Error::Request { .. } => SyncError::RemoteApi(e.to_string()),
				citysdk_api::Error::Authentication(message) => SyncError::Authentication(message),
				e => SyncError::Authentication(e.to_string()),
			})?;

		self.current = Some(cookies.clone());

		Ok(cookies)
	}

	/// Performs `call` with the current session; if the remote refuses those
	/// cookies, logs in again (without persisting) and retries once.
	///
	/// The outer result carries fatal errors, the inner one is the remote's
	/// own answer.
	pub async fn call<T, Fut>(
		&mut self,
		remote: &dyn CitySdkRemote,
		config: &SyncConfig,
		call: impl Fn(SessionCookies) -> Fut,
	) -> Result<Result<T, citysdk_api::Error>, SyncError>
	where
		Fut: Future<Output = Result<T, citysdk_api::Error>>,
	{
		let session = self.ensure_session(remote, config, false).await?;

		match call(session).await {
			Err(e) if e.is_session_rejected() => {
				warn!("CitySDK rejected the session, authenticating again");

				let session = self.ensure_session(remote, config, true).await?;
				match call(session).await {
					Err(e) if e.is_session_rejected() => Err(SyncError::Authentication(e.to_string())),
					res => Ok(res),
				}
			}
			res => Ok(res),
		}
	}
}
