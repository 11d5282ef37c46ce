use citysdk_sync::SyncError;

use tracing_test::traced_test;

mod common;

use common::{config, FakeRemote, Harness};

#[tokio::test]
#[traced_test]
async fn cached_session_needs_no_request() {
	let mut harness = Harness::new(FakeRemote::new(), config()).await;

	let first = harness.engine.ensure_session(false).await.unwrap();
	assert_eq!(harness.remote.logins(), 1);

	let second = harness.engine.ensure_session(false).await.unwrap();
	assert_eq!(first, second);
	assert_eq!(harness.remote.calls().len(), 1);
}

#[tokio::test]
#[traced_test]
async fn cookies_from_config_are_trusted() {
	let mut config = config();
	config.session_cookies = Some([("ss-id", "from-config")].into_iter().collect());
	let mut harness = Harness::new(FakeRemote::new(), config).await;

	let cookies = harness.engine.ensure_session(false).await.unwrap();

	assert_eq!(cookies.get("ss-id"), Some("from-config"));
	assert!(harness.remote.calls().is_empty());
}

#[tokio::test]
#[traced_test]
async fn forced_session_logs_in_again() {
	let mut harness = Harness::new(FakeRemote::new(), config()).await;

	let first = harness.engine.ensure_session(false).await.unwrap();
	let second = harness.engine.ensure_session(true).await.unwrap();

	assert_ne!(first, second);
	assert_eq!(harness.remote.logins(), 2);
}

#[tokio::test]
#[traced_test]
async fn rejected_credentials_surface_remote_message() {
	let remote = FakeRemote::new();
	remote.reject_login("Invalid UserName or Password");
	let mut harness = Harness::new(remote, config()).await;

	let res = harness.engine.ensure_session(false).await;

	match res {
		Err(SyncError::Authentication(message)) => {
			assert_eq!(message, "Invalid UserName or Password")
		}
		other => panic!("unexpected result: {other:?}"),
	}
}

#[tokio::test]
#[traced_test]
async fn ensure_session_does_not_persist() {
	let mut harness = Harness::new(FakeRemote::new(), config()).await;

	harness.engine.ensure_session(true).await.unwrap();

	assert!(harness.stored_config().await.session_cookies.is_none());
}

#[tokio::test]
#[traced_test]
async fn before_start_caches_cookies_in_config() {
	let mut harness = Harness::new(FakeRemote::new(), config()).await;

	harness.engine.before_start().await.unwrap();

	let stored = harness.stored_config().await;
	assert_eq!(
		stored.session_cookies.as_ref().and_then(|c| c.get("ss-id")),
		Some("session-1")
	);
	assert_eq!(stored.session_cookies, harness.engine.config().session_cookies);
}

#[tokio::test]
#[traced_test]
async fn validate_checks_config_then_credentials() {
	let mut config = config();
	config.term = String::new();
	let mut harness = Harness::new(FakeRemote::new(), config).await;

	assert!(matches!(
		harness.engine.validate().await,
		Err(SyncError::Config {
			key: "citysdk_term",
			..
		})
	));
	assert!(harness.remote.calls().is_empty());

	let mut harness = Harness::new(FakeRemote::new(), common::config()).await;
	harness.engine.validate().await.unwrap();
	assert_eq!(harness.remote.logins(), 1);
}
