//! GeoJSON source: turns a `FeatureCollection` into local records.
//!
//! The field mapping table of the synchronization config tells which feature
//! property feeds which local field (`name`, `description`, `address`, `added`,
//! `id`). Unmapped fields are looked up under their own name.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
	error::SyncError,
	record::{LocalRecord, Point, RecordId},
};

pub fn records_from_feature_collection(
	collection: &Value,
	map: &BTreeMap<String, String>,
	organization: &str,
	now: DateTime<Utc>,
) -> Result<Vec<LocalRecord>, SyncError> {
	if collection.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
		return Err(SyncError::Parse(
			"GeoJSON source is not a FeatureCollection".to_string(),
		));
	}

	let features = collection
		.get("features")
		.and_then(Value::as_array)
		.ok_or_else(|| SyncError::Parse("FeatureCollection without features".to_string()))?;

	let empty = Map::new();
	let mut seen = HashSet::new();
	let mut records = Vec::with_capacity(features.len());

	for (index, feature) in features.iter().enumerate() {
		let Some(point) = point_of(feature) else {
			warn!(index, "Skipping GeoJSON feature without a point geometry");
			continue;
		};

		let properties = feature
			.get("properties")
			.and_then(Value::as_object)
			.unwrap_or(&empty);
		let property = |field: &str| {
			properties.get(map.get(field).map(String::as_str).unwrap_or(field))
		};
		let text = |field: &str| {
			property(field)
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_string()
		};

		let id = match property("id").or_else(|| feature.get("id")) {
			Some(value) => match id_of(value) {
				Some(id) => id,
				None => {
					warn!(index, %value, "Unusable GeoJSON feature id, using the feature index");
					index as RecordId
				}
			},
			None => index as RecordId,
		};

		// two records with one identity would be pushed twice
		if !seen.insert(id) {
			warn!(index, id, "Skipping GeoJSON feature whose id is already taken");
			continue;
		}

		let added = property("added")
			.and_then(Value::as_str)
			.and_then(|added| DateTime::parse_from_rfc3339(added).ok())
			.map(|added| added.with_timezone(&Utc))
			.unwrap_or(now);

		records.push(LocalRecord {
			id,
			name: text("name"),
			description: text("description"),
			address: text("address"),
			city: None,
			province: None,
			country: None,
			point: Some(point),
			added,
			organization: organization.to_string(),
		});
	}

	Ok(records)
}

fn point_of(feature: &Value) -> Option<Point> {
	let geometry = feature.get("geometry")?;
	if geometry.get("type").and_then(Value::as_str) != Some("Point") {
		return None;
	}

	match geometry.get("coordinates")?.as_array()?.as_slice() {
		[longitude, latitude, ..] => Some(Point::new(longitude.as_f64()?, latitude.as_f64()?)),
		_ => None,
	}
}

fn id_of(value: &Value) -> Option<RecordId> {
	match value {
		Value::Number(number) => number.as_i64().or_else(|| {
			number
				.as_f64()
				.filter(|id| id.fract() == 0.0 && id.abs() < i64::MAX as f64)
				.map(|id| id as RecordId)
		}),
		Value::String(text) => text.parse().ok(),
		_ => None,
	}
}
