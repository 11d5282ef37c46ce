//! Synchronization of a layer's located records with a CitySDK tourism
//! directory.
//!
//! A run authenticates once, makes sure the configured category exists
//! remotely, then pushes every record with its own round trip, keeping a local
//! mapping from record identity to remote identity.

pub mod category;
pub mod config;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod geojson;
pub mod mapping;
pub mod record;
pub mod remote;
pub mod session;

pub use category::CategoryResolver;
pub use config::{ConfigPatch, ConfigStore, JsonFileConfigStore, SourceKind, SyncConfig};
pub use engine::{FailedRecord, RunSummary, SyncEngine, SyncOutcome};
pub use error::{FileIOError, SyncError};
pub use formatter::{GeoJsonTourismFormatter, RecordFormatter, TourismFormatter};
pub use mapping::{ExternalIdentity, MappingStore, MemoryMappingStore};
pub use record::{LocalRecord, Point, RecordId};
pub use remote::{CitySdkRemote, HttpRemote};
pub use session::SessionManager;

pub use citysdk_api::{Document, RemoteId, SessionCookies};
