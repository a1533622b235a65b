use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use utils::context::Handler;
use utils::prelude::FutureTimeout;

use crate::api;
use crate::config::ApiConfig;
use crate::tests::global::{mock_global_state, GlobalState};

mod streamboard;
mod users;

/// An API server on a free port, backed by [`mock_global_state`].
pub struct TestServer {
	pub global: Arc<GlobalState>,
	pub client: reqwest::Client,
	base: String,
	handler: Handler,
	handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
	pub async fn start() -> Self {
		let port = portpicker::pick_unused_port().expect("failed to pick port");
		let (global, handler) = mock_global_state(ApiConfig {
			bind_address: format!("127.0.0.1:{}", port).parse().unwrap(),
			..Default::default()
		});

		let handle = tokio::spawn(api::run(global.clone()));

		// We need to wait for the server to start
		tokio::time::sleep(Duration::from_millis(300)).await;

		Self {
			global,
			client: reqwest::Client::new(),
			base: format!("http://127.0.0.1:{}", port),
			handler,
			handle,
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base, path)
	}

	pub async fn shutdown(self) {
		// The client uses Keep-Alive, so we need to drop it to release the global context
		drop(self.global);
		drop(self.client);

		self.handler
			.cancel()
			.timeout(Duration::from_secs(1))
			.await
			.expect("failed to cancel context");

		self.handle
			.timeout(Duration::from_secs(1))
			.await
			.expect("api server did not stop")
			.expect("api server panicked")
			.expect("api server failed");
	}

	pub async fn signup(&self, username: &str, password: &str) -> Value {
		let resp = self
			.client
			.post(self.url("/api/signup/"))
			.json(&json!({ "username": username, "password": password }))
			.send()
			.await
			.expect("failed to sign up");

		assert_eq!(resp.status(), StatusCode::CREATED);
		resp.json().await.expect("failed to read body")
	}

	/// Returns the access and refresh tokens.
	pub async fn login(&self, username: &str, password: &str) -> (String, String) {
		let resp = self
			.client
			.post(self.url("/api/login/"))
			.json(&json!({ "username": username, "password": password }))
			.send()
			.await
			.expect("failed to log in");

		assert_eq!(resp.status(), StatusCode::OK);
		let body: Value = resp.json().await.expect("failed to read body");

		(
			body["access"].as_str().expect("missing access token").to_string(),
			body["refresh"].as_str().expect("missing refresh token").to_string(),
		)
	}

	/// Signs up a user and returns an access token for it.
	pub async fn user(&self, username: &str) -> String {
		self.signup(username, "correct horse battery").await;
		self.login(username, "correct horse battery").await.0
	}
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_health() {
	let server = TestServer::start().await;

	let resp = server
		.client
		.get(server.url("/health"))
		.send()
		.await
		.expect("failed to get health");

	assert_eq!(resp.status(), StatusCode::OK);
	let body: Value = resp.json().await.expect("failed to read body");
	assert_eq!(body, json!({"status": "ok"}));

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_not_found() {
	let server = TestServer::start().await;

	let resp = server
		.client
		.get(server.url("/api/nothing-here/"))
		.send()
		.await
		.expect("failed to send request");

	assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	let body: Value = resp.json().await.expect("failed to read body");
	assert_eq!(body["success"], json!(false));

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_cors_preflight() {
	let server = TestServer::start().await;

	let resp = server
		.client
		.request(reqwest::Method::OPTIONS, server.url("/api/streamboard/list/"))
		.header("Origin", "http://localhost:3000")
		.header("Access-Control-Request-Method", "GET")
		.send()
		.await
		.expect("failed to send preflight");

	assert_eq!(resp.status(), StatusCode::NO_CONTENT);
	assert_eq!(
		resp.headers()
			.get("access-control-allow-origin")
			.and_then(|v| v.to_str().ok()),
		Some("http://localhost:3000")
	);

	server.shutdown().await;
}
