use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coordinate reference system every point is published in.
pub const WGS84_SRS_NAME: &str = "http://www.opengis.net/def/crs/EPSG/0/4326";
pub const VCARD_MIME_TYPE: &str = "text/vcard";
pub const OPEN_DATA_LICENSE: &str = "open-data";

/// Opaque identifier the remote directory assigns to categories and records.
///
/// The API is not consistent about its encoding, some deployments answer with
/// JSON strings and others with bare numbers, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RemoteId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for RemoteId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<&str> for RemoteId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl<'de> Deserialize<'de> for RemoteId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Text(String),
			Number(serde_json::Number),
		}

		match Raw::deserialize(deserializer)? {
			Raw::Text(id) => Ok(Self(id)),
			Raw::Number(id) => Ok(Self(id.to_string())),
		}
	}
}

/// A `{term, value, lang}` triple, the building block of most CitySDK fields.
/// Which of `term` and `lang` are present depends on the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lang: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub term: Option<String>,
	pub value: String,
}

impl Term {
	pub fn primary(value: impl Into<String>) -> Self {
		Self {
			lang: None,
			term: Some("primary".to_string()),
			value: value.into(),
		}
	}

	pub fn localized(value: impl Into<String>, lang: impl Into<String>) -> Self {
		Self {
			lang: Some(lang.into()),
			term: None,
			value: value.into(),
		}
	}

	fn with_term(mut self, term: impl Into<String>) -> Self {
		self.term = Some(term.into());
		self
	}
}

/// One entry of a category listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
	pub id: RemoteId,
	#[serde(default)]
	pub value: String,
	#[serde(default)]
	pub label: Vec<Term>,
}

impl Category {
	/// Whether `label` names this category, either as its value or as one of
	/// its (possibly localized) labels.
	pub fn is_labelled(&self, label: &str) -> bool {
		self.value == label || self.label.iter().any(|term| term.value == label)
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryListing {
	#[serde(default)]
	pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBody {
	pub label: Vec<Term>,
	pub lang: String,
	pub term: String,
	pub value: String,
}

/// Body of the category creation PUT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDocument {
	/// Resource type the category belongs to (`poi`, `event`, `route`)
	pub list: String,
	pub category: CategoryBody,
}

impl CategoryDocument {
	pub fn new(resource_type: &str, label: &str, lang: &str) -> Self {
		Self {
			list: resource_type.to_string(),
			category: CategoryBody {
				label: vec![Term::localized(label, lang).with_term("primary")],
				lang: lang.to_string(),
				term: "category".to_string(),
				value: label.to_string(),
			},
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GmlPoint {
	#[serde(rename = "posList")]
	pub pos_list: String,
	#[serde(rename = "srsName")]
	pub srs_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointEntry {
	#[serde(rename = "Point")]
	pub point: GmlPoint,
	pub term: String,
}

impl PointEntry {
	/// The API wants `"lat lon"`, the opposite of the usual storage order.
	pub fn wgs84(longitude: f64, latitude: f64, term: impl Into<String>) -> Self {
		Self {
			point: GmlPoint {
				pos_list: format!("{latitude:?} {longitude:?}"),
				srs_name: WGS84_SRS_NAME.to_string(),
			},
			term: term.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressBlock {
	pub value: String,
	#[serde(rename = "type")]
	pub mime_type: String,
}

impl AddressBlock {
	pub fn vcard(card: impl Into<String>) -> Self {
		Self {
			value: card.into(),
			mime_type: VCARD_MIME_TYPE.to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
	pub point: Vec<PointEntry>,
	pub address: AddressBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRef {
	pub id: RemoteId,
}

/// The record itself, as nested under the resource type key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPayload {
	/// Only present on updates
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<RemoteId>,
	pub location: Location,
	pub label: Vec<Term>,
	pub description: Vec<Term>,
	pub category: Vec<CategoryRef>,
	pub base: String,
	pub lang: String,
	pub created: String,
	pub author: Term,
	pub license: Term,
}

/// A record document, serialized as `{ "<resource type>": { ... } }` so the
/// remote API can route it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	resource_type: String,
	record: RecordPayload,
}

impl Document {
	pub fn new(resource_type: impl Into<String>, record: RecordPayload) -> Self {
		Self {
			resource_type: resource_type.into(),
			record,
		}
	}

	pub fn resource_type(&self) -> &str {
		&self.resource_type
	}

	pub fn record(&self) -> &RecordPayload {
		&self.record
	}

	pub fn id(&self) -> Option<&RemoteId> {
		self.record.id.as_ref()
	}

	/// Attach the remote identity, turning a creation document into an update one.
	pub fn with_id(mut self, id: RemoteId) -> Self {
		self.record.id = Some(id);
		self
	}
}

impl Serialize for Document {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		use serde::ser::SerializeMap;

		let mut map = serializer.serialize_map(Some(1))?;
		map.serialize_entry(&self.resource_type, &self.record)?;
		map.end()
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct Created {
	pub id: RemoteId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
	#[serde(rename = "ResponseStatus")]
	pub response_status: ResponseStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseStatus {
	#[serde(rename = "Message")]
	pub message: String,
}
