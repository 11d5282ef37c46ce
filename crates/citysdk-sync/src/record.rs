use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a local record, never sent to the remote API.
pub type RecordId = i64;

/// WGS84 point, stored longitude first like every GIS library does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub longitude: f64,
	pub latitude: f64,
}

impl Point {
	pub fn new(longitude: f64, latitude: f64) -> Self {
		Self {
			longitude,
			latitude,
		}
	}

	pub fn is_valid(&self) -> bool {
		self.longitude.is_finite()
			&& self.latitude.is_finite()
			&& (-180.0..=180.0).contains(&self.longitude)
			&& (-90.0..=90.0).contains(&self.latitude)
	}
}

/// A located entity owned by the surrounding application; we only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
	pub id: RecordId,
	pub name: String,
	#[serde(default)]
	pub description: String,
	/// Street address as typed by the user
	#[serde(default)]
	pub address: String,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub province: Option<String>,
	#[serde(default)]
	pub country: Option<String>,
	pub point: Option<Point>,
	pub added: DateTime<Utc>,
	/// Organization owning the layer, published as the record author
	pub organization: String,
}
