use std::{fmt::Display, path::Path};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
	/// Bad credentials or a session the remote refused twice
	#[error("authentication failed: {0}")]
	Authentication(String),
	#[error("remote API error: {0}")]
	RemoteApi(String),
	#[error("record is missing required field <field='{field}'>")]
	Validation { field: &'static str },
	#[error("malformed remote response: {0}")]
	Parse(String),
	/// The remote contradicted something we just observed from it
	#[error("remote state is inconsistent: {0}")]
	Consistency(String),

	#[error("invalid synchronization config <key='{key}'>: {reason}")]
	Config { key: &'static str, reason: String },
	#[error("mapping store error: {0}")]
	MappingStore(String),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error(transparent)]
	Serialization(#[from] serde_json::Error),
}

impl SyncError {
	/// Errors that make every following record fail as well, so a run must stop.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Self::Authentication(_)
				| Self::Consistency(_)
				| Self::Config { .. }
				| Self::FileIO(_)
				| Self::MappingStore(_)
		)
	}

	pub(crate) fn missing(field: &'static str) -> Self {
		Self::Validation { field }
	}
}

impl From<citysdk_api::Error> for SyncError {
	fn from(e: citysdk_api::Error) -> Self {
		match e {
			citysdk_api::Error::Authentication(message) => Self::Authentication(message),
			citysdk_api::Error::Decode { .. } => Self::Parse(e.to_string()),
			citysdk_api::Error::Request { .. } | citysdk_api::Error::Status { .. } => {
				Self::RemoteApi(e.to_string())
			}
		}
	}
}

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: std::io::Error,
	pub maybe_context: Option<&'static str>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"file I/O error{}: {}; path: '{}'",
			self.maybe_context
				.map(|ctx| format!(" ({ctx})"))
				.unwrap_or_default(),
			self.source,
			self.path.display()
		)
	}
}

impl<P: AsRef<Path>> From<(P, std::io::Error)> for FileIOError {
	fn from((path, source): (P, std::io::Error)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}
}

impl<P: AsRef<Path>> From<(P, std::io::Error, &'static str)> for FileIOError {
	fn from((path, source, context): (P, std::io::Error, &'static str)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(context),
		}
	}
}
