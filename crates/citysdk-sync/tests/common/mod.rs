#![allow(dead_code)]

use std::{
	collections::{BTreeMap, HashMap, HashSet, VecDeque},
	sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use citysdk_api::{Category, CategoryDocument, Document, Error, RemoteId, SessionCookies};
use citysdk_sync::{
	CitySdkRemote, ConfigStore, JsonFileConfigStore, LocalRecord, MappingStore,
	MemoryMappingStore, Point, RecordFormatter, SyncConfig, SyncEngine, TourismFormatter,
};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const LAYER: &str = "rome";
const SESSION_COOKIE: &str = "ss-id";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
	Login,
	ListCategories,
	CreateCategory(Value),
	CreateRecord(Value),
	UpdateRecord(Value),
	DeleteRecord(RemoteId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
	ListCategories,
	CreateCategory,
	CreateRecord,
	UpdateRecord,
	DeleteRecord,
}

/// In-memory CitySDK: hands out sessions, keeps categories and records, and
/// records every call it receives.
#[derive(Default)]
pub struct FakeRemote {
	state: Mutex<State>,
}

#[derive(Default)]
struct State {
	calls: Vec<Call>,
	login_rejection: Option<String>,
	sessions_issued: usize,
	valid_sessions: HashSet<String>,
	categories: Vec<Category>,
	records: BTreeMap<RemoteId, Value>,
	next_id: usize,
	failures: HashMap<Op, VecDeque<u16>>,
	malformed_creates: usize,
}

impl FakeRemote {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn with_category(self: &Arc<Self>, id: &str, value: &str) -> Arc<Self> {
		self.state.lock().unwrap().categories.push(Category {
			id: RemoteId::new(id),
			value: value.to_string(),
			label: vec![],
		});
		Arc::clone(self)
	}

	pub fn push_category(&self, category: Category) {
		self.state.lock().unwrap().categories.push(category);
	}

	pub fn remove_categories(&self) {
		self.state.lock().unwrap().categories.clear();
	}

	pub fn reject_login(&self, message: &str) {
		self.state.lock().unwrap().login_rejection = Some(message.to_string());
	}

	/// Next `op` call answers with `status` instead of doing its job
	pub fn fail_next(&self, op: Op, status: u16) {
		self.state
			.lock()
			.unwrap()
			.failures
			.entry(op)
			.or_default()
			.push_back(status);
	}

	pub fn malformed_next_create(&self) {
		self.state.lock().unwrap().malformed_creates += 1;
	}

	/// Every session handed out so far stops working
	pub fn expire_sessions(&self) {
		self.state.lock().unwrap().valid_sessions.clear();
	}

	pub fn calls(&self) -> Vec<Call> {
		self.state.lock().unwrap().calls.clone()
	}

	pub fn clear_calls(&self) {
		self.state.lock().unwrap().calls.clear();
	}

	pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
		self.calls().iter().filter(|call| matches(call)).count()
	}

	pub fn logins(&self) -> usize {
		self.count(|call| matches!(call, Call::Login))
	}

	pub fn records(&self) -> BTreeMap<RemoteId, Value> {
		self.state.lock().unwrap().records.clone()
	}

	pub fn categories(&self) -> Vec<Category> {
		self.state.lock().unwrap().categories.clone()
	}
}

fn status(url: &str, status: u16) -> Error {
	Error::Status {
		url: format!("fake://{url}"),
		status,
		body: format!("{{\"ResponseStatus\":{{\"Message\":\"status {status}\"}}}}"),
	}
}

impl State {
	fn check(&mut self, session: &SessionCookies, op: Op, url: &str) -> Result<(), Error> {
		match session.get(SESSION_COOKIE) {
			Some(id) if self.valid_sessions.contains(id) => {}
			_ => return Err(status(url, 401)),
		}

		match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
			Some(code) => Err(status(url, code)),
			None => Ok(()),
		}
	}

	fn next_id(&mut self, prefix: &str) -> RemoteId {
		self.next_id += 1;
		RemoteId::new(format!("{prefix}-{}", self.next_id))
	}
}

#[async_trait]
impl CitySdkRemote for FakeRemote {
	async fn login(&self, username: &str, password: &str) -> Result<SessionCookies, Error> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(Call::Login);

		if let Some(message) = &state.login_rejection {
			return Err(Error::Authentication(message.clone()));
		}

		if username.is_empty() || password.is_empty() {
			return Err(Error::Authentication("Invalid UserName or Password".to_string()));
		}

		state.sessions_issued += 1;
		let id = format!("session-{}", state.sessions_issued);
		state.valid_sessions.insert(id.clone());

		Ok([(SESSION_COOKIE, id)].into_iter().collect())
	}

	async fn list_categories(
		&self,
		session: &SessionCookies,
		_resource_type: &str,
	) -> Result<Vec<Category>, Error> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(Call::ListCategories);
		state.check(session, Op::ListCategories, "categories")?;

		Ok(state.categories.clone())
	}

	async fn create_category(
		&self,
		session: &SessionCookies,
		document: &CategoryDocument,
	) -> Result<RemoteId, Error> {
		let mut state = self.state.lock().unwrap();
		state
			.calls
			.push(Call::CreateCategory(serde_json::to_value(document).unwrap()));
		state.check(session, Op::CreateCategory, "categories")?;

		let id = state.next_id("cat");
		state.categories.push(Category {
			id: id.clone(),
			value: document.category.value.clone(),
			label: document.category.label.clone(),
		});

		Ok(id)
	}

	async fn create_record(
		&self,
		session: &SessionCookies,
		document: &Document,
	) -> Result<RemoteId, Error> {
		let mut state = self.state.lock().unwrap();
		let value = serde_json::to_value(document).unwrap();
		state.calls.push(Call::CreateRecord(value.clone()));
		state.check(session, Op::CreateRecord, "records")?;

		if state.malformed_creates > 0 {
			state.malformed_creates -= 1;
			return Err(Error::Decode {
				url: "fake://records".to_string(),
				reason: "expected value at line 1 column 1".to_string(),
			});
		}

		let id = state.next_id("rec");
		state.records.insert(id.clone(), value);

		Ok(id)
	}

	async fn update_record(&self, session: &SessionCookies, document: &Document) -> Result<(), Error> {
		let mut state = self.state.lock().unwrap();
		let value = serde_json::to_value(document).unwrap();
		state.calls.push(Call::UpdateRecord(value.clone()));
		state.check(session, Op::UpdateRecord, "records")?;

		match document.id() {
			Some(id) if state.records.contains_key(id) => {
				state.records.insert(id.clone(), value);
				Ok(())
			}
			_ => Err(status("records", 404)),
		}
	}

	async fn delete_record(
		&self,
		session: &SessionCookies,
		_resource_type: &str,
		id: &RemoteId,
	) -> Result<(), Error> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(Call::DeleteRecord(id.clone()));
		state.check(session, Op::DeleteRecord, "records")?;

		match state.records.remove(id) {
			Some(_) => Ok(()),
			None => Err(status("records", 404)),
		}
	}
}

pub fn config() -> SyncConfig {
	serde_json::from_value(json!({
		"url": "http://nodeshot.example/api/layers/rome/nodes.json",
		"citysdk_url": "http://citysdk.example/ns/",
		"citysdk_category": "wifi",
		"citysdk_type": "poi",
		"citysdk_username": "nodeshot",
		"citysdk_password": "secret",
		"citysdk_lang": "it",
		"citysdk_term": "centre"
	}))
	.unwrap()
}

pub fn record(id: i64, name: &str) -> LocalRecord {
	LocalRecord {
		id,
		name: name.to_string(),
		description: String::new(),
		address: format!("Via {name} {id}"),
		city: Some("Roma".to_string()),
		province: Some("RM".to_string()),
		country: Some("Italia".to_string()),
		point: Some(Point::new(12.49 + id as f64 / 1000.0, 41.89)),
		added: Utc.with_ymd_and_hms(2014, 2, 1, 9, 0, 0).unwrap(),
		organization: "Ninux.org".to_string(),
	}
}

pub struct Harness<F = TourismFormatter> {
	pub engine: SyncEngine<F>,
	pub remote: Arc<FakeRemote>,
	pub store: Arc<JsonFileConfigStore>,
	pub mappings: Arc<MemoryMappingStore>,
	pub dir: TempDir,
}

impl Harness {
	pub async fn new(remote: Arc<FakeRemote>, config: SyncConfig) -> Self {
		Self::with_formatter(remote, config, TourismFormatter).await
	}

	/// A harness whose setup already happened: category resolved, cookies cached
	pub async fn ready(remote: Arc<FakeRemote>) -> Self {
		let mut harness = Self::new(remote, config()).await;
		harness.engine.before_start().await.unwrap();
		harness.engine.resolve_category().await.unwrap();
		harness.remote.clear_calls();
		harness
	}
}

impl<F: RecordFormatter> Harness<F> {
	pub async fn with_formatter(remote: Arc<FakeRemote>, config: SyncConfig, formatter: F) -> Self {
		let dir = tempfile::tempdir().unwrap();
		let store = Arc::new(JsonFileConfigStore::new(dir.path()));
		let mappings = Arc::new(MemoryMappingStore::new());

		store.save(LAYER, &config).await.unwrap();

		let engine = SyncEngine::load(
			LAYER,
			formatter,
			Arc::clone(&remote) as Arc<dyn CitySdkRemote>,
			Arc::clone(&store) as Arc<dyn ConfigStore>,
			Arc::clone(&mappings) as Arc<dyn MappingStore>,
		)
		.await
		.unwrap();

		Self {
			engine,
			remote,
			store,
			mappings,
			dir,
		}
	}

	pub async fn stored_config(&self) -> SyncConfig {
		self.store.load(LAYER).await.unwrap()
	}
}
