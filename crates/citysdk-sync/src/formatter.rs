//! Local record to CitySDK document conversion.
//!
//! Both formatters share the category, author and license boilerplate and only
//! differ in how the address card and the description are put together.

use chrono::{DateTime, Utc};
use citysdk_api::{
	AddressBlock, CategoryRef, Document, Location, PointEntry, RecordPayload, RemoteId, Term,
	OPEN_DATA_LICENSE,
};

use crate::{
	config::{SourceKind, SyncConfig},
	error::SyncError,
	record::LocalRecord,
};

/// Pure conversion, no I/O: the same input always gives the same document.
pub trait RecordFormatter: Send + Sync {
	fn source_kind(&self) -> SourceKind;

	fn format(
		&self,
		record: &LocalRecord,
		config: &SyncConfig,
		category_id: &RemoteId,
	) -> Result<Document, SyncError>;
}

/// Nodes with a structured address (street, city, province, country).
#[derive(Debug, Clone, Copy, Default)]
pub struct TourismFormatter;

impl RecordFormatter for TourismFormatter {
	fn source_kind(&self) -> SourceKind {
		SourceKind::Tourism
	}

	fn format(
		&self,
		record: &LocalRecord,
		config: &SyncConfig,
		category_id: &RemoteId,
	) -> Result<Document, SyncError> {
		let name = required(&record.name, "name")?;
		let address = required(&record.address, "address")?;
		let city = required_opt(&record.city, "city")?;
		let province = required_opt(&record.province, "province")?;
		let country = required_opt(&record.country, "country")?;

		let description = if record.description.trim().is_empty() {
			format!("{name} in {address}")
		} else {
			record.description.clone()
		};

		let card = format!(
			"BEGIN:VCARD\nN:;{name};;;;\nADR;INTL;PARCEL;WORK:;;{address};{city};{province};;{country}\nEND:VCARD"
		);

		build(record, config, category_id, name, card, description)
	}
}

/// Nodes imported from GeoJSON, which only carry a flat description.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonTourismFormatter;

impl RecordFormatter for GeoJsonTourismFormatter {
	fn source_kind(&self) -> SourceKind {
		SourceKind::GeoJson
	}

	fn format(
		&self,
		record: &LocalRecord,
		config: &SyncConfig,
		category_id: &RemoteId,
	) -> Result<Document, SyncError> {
		let name = required(&record.name, "name")?;

		let description = if record.description.trim().is_empty() {
			name.to_string()
		} else {
			record.description.clone()
		};

		let card = format!("BEGIN:VCARD\nN:;{name};;;;\nADR;INTL;PARCEL;WORK:;;{description};\nEND:VCARD");

		build(record, config, category_id, name, card, description)
	}
}

fn build(
	record: &LocalRecord,
	config: &SyncConfig,
	category_id: &RemoteId,
	name: &str,
	card: String,
	description: String,
) -> Result<Document, SyncError> {
	let point = record
		.point
		.filter(|point| point.is_valid())
		.ok_or_else(|| SyncError::missing("point"))?;
	let author = required(&record.organization, "organization")?;

	Ok(Document::new(
		config.resource_type.clone(),
		RecordPayload {
			id: None,
			location: Location {
				point: vec![PointEntry::wgs84(
					point.longitude,
					point.latitude,
					config.term.clone(),
				)],
				address: AddressBlock::vcard(card),
			},
			label: vec![Term::primary(name)],
			description: vec![Term::localized(description, config.lang.clone())],
			category: vec![CategoryRef {
				id: category_id.clone(),
			}],
			base: config.resource_url(),
			lang: config.lang.clone(),
			created: created_text(&record.added),
			author: Term::primary(author),
			license: Term::primary(OPEN_DATA_LICENSE),
		},
	))
}

/// `2014-03-05 10:21:03.412000+00:00`, dropping the fraction when it is zero
fn created_text(added: &DateTime<Utc>) -> String {
	if added.timestamp_subsec_micros() == 0 {
		added.format("%Y-%m-%d %H:%M:%S%:z").to_string()
	} else {
		added.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
	}
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, SyncError> {
	let value = value.trim();
	if value.is_empty() {
		Err(SyncError::missing(field))
	} else {
		Ok(value)
	}
}

fn required_opt<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, SyncError> {
	required(value.as_deref().unwrap_or_default(), field)
}
