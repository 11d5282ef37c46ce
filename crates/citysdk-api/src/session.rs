use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cookie set handed out by the authentication endpoint.
///
/// Opaque to us: it stays valid until the API rejects a request made with it.
/// Serialized as a flat `name -> value` object so it can be cached in the
/// synchronization configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCookies(BTreeMap<String, String>);

impl SessionCookies {
	pub fn from_response(response: &reqwest::Response) -> Self {
		Self(
			response
				.cookies()
				.map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
				.collect(),
		)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str)
	}

	/// Value for a `Cookie` request header, `None` when there is nothing to send
	pub fn header_value(&self) -> Option<String> {
		if self.0.is_empty() {
			return None;
		}

		Some(
			self.0
				.iter()
				.map(|(name, value)| format!("{name}={value}"))
				.collect::<Vec<_>>()
				.join("; "),
		)
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SessionCookies {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|(name, value)| (name.into(), value.into()))
				.collect(),
		)
	}
}
