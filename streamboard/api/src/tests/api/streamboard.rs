use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::TestServer;
use crate::tests::blob::PNG;

fn png_part(name: &str) -> Part {
	Part::bytes(PNG.to_vec())
		.file_name(name.to_string())
		.mime_str("image/png")
		.unwrap()
}

fn timestamp(value: &Value) -> DateTime<Utc> {
	serde_json::from_value(value.clone()).expect("invalid timestamp")
}

impl TestServer {
	async fn create_streamboard(&self, access: &str, title: &str) -> Value {
		let form = Form::new()
			.text("title", title.to_string())
			.text("layout_json", r#"{"widgets":[{"kind":"chat","x":0,"y":0}]}"#)
			.part("background_image", png_part("background.png"));

		let resp = self
			.client
			.post(self.url("/api/streamboard/"))
			.bearer_auth(access)
			.multipart(form)
			.send()
			.await
			.expect("failed to create streamboard");

		assert_eq!(resp.status(), StatusCode::CREATED);
		resp.json().await.expect("failed to read body")
	}

	async fn get_json(&self, access: &str, path: &str) -> (StatusCode, Value) {
		let resp = self
			.client
			.get(self.url(path))
			.bearer_auth(access)
			.send()
			.await
			.expect("failed to send request");

		let status = resp.status();
		let body = resp.json().await.unwrap_or(Value::Null);
		(status, body)
	}
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_streamboard_requires_auth() {
	let server = TestServer::start().await;

	for path in ["/api/streamboard/list/", "/api/streamboard/latest/", "/api/streamboard/recent-viewed/"] {
		let resp = server
			.client
			.get(server.url(path))
			.send()
			.await
			.expect("failed to send request");
		assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
	}

	let resp = server
		.client
		.post(server.url("/api/streamboard/"))
		.json(&json!({ "title": "anonymous", "layout_json": {} }))
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_create_with_untouched_file_input() {
	let server = TestServer::start().await;
	let access = server.user("streamer").await;

	let form = Form::new()
		.text("title", "  Untouched logo  ")
		.text("layout_json", "{}")
		.part("background_image", png_part("background.png"))
		.part("logo", Part::bytes(Vec::new()).file_name(""));

	let resp = server
		.client
		.post(server.url("/api/streamboard/"))
		.bearer_auth(&access)
		.multipart(form)
		.send()
		.await
		.expect("failed to create streamboard");
	assert_eq!(resp.status(), StatusCode::CREATED);

	let created: Value = resp.json().await.expect("failed to read body");
	assert_eq!(created["title"], json!("Untouched logo"));
	assert_eq!(created["logo"], Value::Null);

	let id = created["id"].as_str().expect("missing id");
	let form = Form::new().part("background_image", Part::bytes(Vec::new()).file_name(""));
	let resp = server
		.client
		.patch(server.url(&format!("/api/streamboard/{id}/")))
		.bearer_auth(&access)
		.multipart(form)
		.send()
		.await
		.expect("failed to update streamboard");
	assert_eq!(resp.status(), StatusCode::OK);

	let updated: Value = resp.json().await.expect("failed to read body");
	assert_eq!(updated["background_image"], created["background_image"]);

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_create_and_retrieve() {
	let server = TestServer::start().await;
	let access = server.user("streamer").await;

	let form = Form::new()
		.text("title", "Main stage")
		.text("layout_json", r#"{"widgets":[]}"#)
		.part("background_image", png_part("background.png"))
		.part("logo", png_part("logo.png"));

	let resp = server
		.client
		.post(server.url("/api/streamboard/"))
		.bearer_auth(&access)
		.multipart(form)
		.send()
		.await
		.expect("failed to create streamboard");
	assert_eq!(resp.status(), StatusCode::CREATED);

	let created: Value = resp.json().await.expect("failed to read body");
	assert_eq!(created["title"], json!("Main stage"));
	assert_eq!(created["layout_json"], json!({"widgets": []}));
	assert!(created["background_image"]
		.as_str()
		.expect("missing background")
		.starts_with("/media/streamboards/backgrounds/"));
	assert!(created["logo"].as_str().expect("missing logo").starts_with("/media/streamboards/logo/"));
	assert_eq!(created["created_at"], created["updated_at"]);
	assert_eq!(created["created_at"], created["last_view"]);

	let (_, profile) = server.get_json(&access, "/api/profile/").await;
	assert_eq!(created["user"], profile["id"]);

	let id = created["id"].as_str().expect("missing id");

	let resp = server
		.client
		.get(server.url(created["background_image"].as_str().unwrap()))
		.send()
		.await
		.expect("failed to get media");
	assert_eq!(resp.status(), StatusCode::OK);

	let (status, viewed) = server.get_json(&access, &format!("/api/streamboard/{id}/")).await;
	assert_eq!(status, StatusCode::OK);
	assert!(timestamp(&viewed["last_view"]) >= timestamp(&created["last_view"]));
	assert_eq!(viewed["updated_at"], created["updated_at"]);

	let (status, again) = server.get_json(&access, &format!("/api/streamboard/{id}/retrieve/")).await;
	assert_eq!(status, StatusCode::OK);
	assert!(timestamp(&again["last_view"]) >= timestamp(&viewed["last_view"]));

	let (status, list) = server.get_json(&access, "/api/streamboard/list/").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(list.as_array().map(Vec::len), Some(1));
	assert_eq!(list[0]["id"], created["id"]);

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_create_validation() {
	let server = TestServer::start().await;
	let access = server.user("streamer").await;

	let resp = server
		.client
		.post(server.url("/api/streamboard/"))
		.bearer_auth(&access)
		.json(&json!({ "title": "No background", "layout_json": {} }))
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	let body: Value = resp.json().await.expect("failed to read body");
	assert!(body["errors"]["background_image"].is_array());

	let form = Form::new()
		.text("title", "Broken layout")
		.text("layout_json", "{not json")
		.part("background_image", png_part("background.png"));

	let resp = server
		.client
		.post(server.url("/api/streamboard/"))
		.bearer_auth(&access)
		.multipart(form)
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	let body: Value = resp.json().await.expect("failed to read body");
	assert!(body["errors"]["layout_json"].is_array());

	let form = Form::new().text("layout_json", "{}").part(
		"background_image",
		Part::bytes(b"plain text".to_vec()).file_name("background.png"),
	);

	let resp = server
		.client
		.post(server.url("/api/streamboard/"))
		.bearer_auth(&access)
		.multipart(form)
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	let body: Value = resp.json().await.expect("failed to read body");
	assert!(body["errors"]["background_image"].is_array());

	// Nothing was stored along the way
	let (_, list) = server.get_json(&access, "/api/streamboard/list/").await;
	assert_eq!(list, json!([]));

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_owner_scoping() {
	let server = TestServer::start().await;
	let alice = server.user("alice").await;
	let bob = server.user("bob").await;

	let board = server.create_streamboard(&alice, "Alice's board").await;
	let path = format!("/api/streamboard/{}/", board["id"].as_str().unwrap());

	let (status, _) = server.get_json(&bob, &path).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	let resp = server
		.client
		.patch(server.url(&path))
		.bearer_auth(&bob)
		.json(&json!({ "title": "Taken over" }))
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::NOT_FOUND);

	let resp = server
		.client
		.delete(server.url(&path))
		.bearer_auth(&bob)
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::NOT_FOUND);

	let (_, list) = server.get_json(&bob, "/api/streamboard/list/").await;
	assert_eq!(list, json!([]));
	let (_, recent) = server.get_json(&bob, "/api/streamboard/recent-viewed/").await;
	assert_eq!(recent, json!([]));

	let (status, owned) = server.get_json(&alice, &path).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(owned["title"], json!("Alice's board"));

	// Ids that do not parse are simply not found
	let (status, _) = server.get_json(&alice, "/api/streamboard/not-an-id/").await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_latest_and_recent_viewed() {
	let server = TestServer::start().await;
	let access = server.user("streamer").await;

	let resp = server
		.client
		.get(server.url("/api/streamboard/latest/"))
		.bearer_auth(&access)
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::NO_CONTENT);
	assert!(resp.bytes().await.expect("failed to read body").is_empty());

	let mut ids = Vec::new();
	for i in 0..4 {
		tokio::time::sleep(Duration::from_millis(5)).await;
		let board = server.create_streamboard(&access, &format!("Board {i}")).await;
		ids.push(board["id"].clone());
	}

	for id in &ids {
		tokio::time::sleep(Duration::from_millis(5)).await;
		let (status, _) = server
			.get_json(&access, &format!("/api/streamboard/{}/", id.as_str().unwrap()))
			.await;
		assert_eq!(status, StatusCode::OK);
	}

	let (_, before) = server.get_json(&access, "/api/streamboard/list/").await;

	let (status, recent) = server.get_json(&access, "/api/streamboard/recent-viewed/").await;
	assert_eq!(status, StatusCode::OK);
	let recent_ids: Vec<_> = recent.as_array().unwrap().iter().map(|b| b["id"].clone()).collect();
	assert_eq!(recent_ids, vec![ids[3].clone(), ids[2].clone(), ids[1].clone()]);

	let (status, latest) = server.get_json(&access, "/api/streamboard/latest/").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(latest["id"], ids[3]);

	// None of the read-only queries touched last_view
	let (_, after) = server.get_json(&access, "/api/streamboard/list/").await;
	assert_eq!(before, after);

	// List is newest-created first
	let list_ids: Vec<_> = after.as_array().unwrap().iter().map(|b| b["id"].clone()).collect();
	assert_eq!(list_ids, ids.iter().rev().cloned().collect::<Vec<_>>());

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_partial_update() {
	let server = TestServer::start().await;
	let access = server.user("streamer").await;

	let board = server.create_streamboard(&access, "Old Title").await;
	let path = format!("/api/streamboard/{}/", board["id"].as_str().unwrap());

	let resp = server
		.client
		.patch(server.url(&path))
		.bearer_auth(&access)
		.json(&json!({ "title": "New Title" }))
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::OK);
	let updated: Value = resp.json().await.expect("failed to read body");
	assert_eq!(updated["title"], json!("New Title"));
	assert_eq!(updated["layout_json"], board["layout_json"]);
	assert_eq!(updated["background_image"], board["background_image"]);
	assert_eq!(updated["logo"], board["logo"]);
	assert_eq!(updated["created_at"], board["created_at"]);
	assert_eq!(updated["last_view"], board["last_view"]);
	assert!(timestamp(&updated["updated_at"]) >= timestamp(&board["updated_at"]));

	let resp = server
		.client
		.patch(server.url(&path))
		.bearer_auth(&access)
		.json(&json!({ "layout_json": "{\"widgets\": " }))
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	let body: Value = resp.json().await.expect("failed to read body");
	assert!(body["errors"]["layout_json"].is_array());

	let (_, stored) = server.get_json(&access, &path).await;
	assert_eq!(stored["title"], json!("New Title"));
	assert_eq!(stored["layout_json"], board["layout_json"]);
	assert_eq!(stored["updated_at"], updated["updated_at"]);

	// A layout given as a string replaces the old one wholesale
	let form = Form::new()
		.text("layout_json", r#"{"theme":"dark"}"#)
		.part("logo", png_part("logo.png"));

	let resp = server
		.client
		.patch(server.url(&path))
		.bearer_auth(&access)
		.multipart(form)
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::OK);
	let updated: Value = resp.json().await.expect("failed to read body");
	assert_eq!(updated["layout_json"], json!({"theme": "dark"}));
	assert!(updated["logo"].as_str().expect("missing logo").starts_with("/media/streamboards/logo/"));
	assert_eq!(updated["title"], json!("New Title"));

	server.shutdown().await;
}

#[serial_test::serial]
#[tokio::test]
async fn test_serial_delete() {
	let server = TestServer::start().await;
	let access = server.user("streamer").await;

	let board = server.create_streamboard(&access, "Short lived").await;
	let path = format!("/api/streamboard/{}/", board["id"].as_str().unwrap());

	let resp = server
		.client
		.delete(server.url(&path))
		.bearer_auth(&access)
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::NO_CONTENT);

	let (status, _) = server.get_json(&access, &path).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	let resp = server
		.client
		.delete(server.url(&path))
		.bearer_auth(&access)
		.send()
		.await
		.expect("failed to send request");
	assert_eq!(resp.status(), StatusCode::NOT_FOUND);

	server.shutdown().await;
}
