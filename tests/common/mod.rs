#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use recipe_api::{
    jwt::SessionKeys,
    memory::MemoryStore,
    routes::{api, Context},
    schema::User,
    store::EntityStore,
    MediaStorage,
};
use serde_json::Value;
use tempfile::TempDir;
use warp::http::StatusCode;

pub const BOUNDARY: &str = "recipe-api-test-boundary";

/// A complete 1x1 RGB PNG.
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
    0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8, 0xCF, 0xC0, 0x00,
    0x00, 0x03, 0x01, 0x01, 0x00, 0xC9, 0xFE, 0x92, 0xEF, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E,
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub keys: SessionKeys,
    pub media: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            keys: SessionKeys::new(b"integration-test-secret", Duration::hours(1)).unwrap(),
            media: tempfile::tempdir().unwrap(),
        }
    }

    pub fn context(&self) -> Context {
        Context::new(
            self.store.clone(),
            self.keys.clone(),
            MediaStorage::new(self.media.path()),
            1024 * 1024,
        )
    }

    /// Registers a user and returns it with a valid token.
    pub async fn user(&self, email: &str) -> (User, String) {
        let user = self
            .store
            .register_user(email, "Test User", "not-a-real-hash")
            .await
            .unwrap()
            .unwrap();
        let token = self.keys.generate_jwt_session(&user).unwrap();

        (user, token)
    }

    async fn send(&self, request: warp::test::RequestBuilder) -> Response {
        let filter = api(self.context());
        let response = request.reply(&filter).await;

        let bytes = response.body().to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Response {
            status: response.status(),
            body,
            bytes,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = warp::test::request().method(method).path(path);

        if let Some(token) = token {
            request = request.header("authorization", format!("Token {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: &str) -> Response {
        self.request("GET", path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Response {
        self.request("POST", path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Response {
        self.request("PATCH", path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Response {
        self.request("PUT", path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Response {
        self.request("DELETE", path, Some(token), None).await
    }

    /// Posts a multipart body with a single file field.
    pub async fn upload(
        &self,
        path: &str,
        token: &str,
        field: &str,
        filename: &str,
        data: &[u8],
    ) -> Response {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = warp::test::request()
            .method("POST")
            .path(path)
            .header("authorization", format!("Token {token}"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body);

        self.send(request).await
    }

    /// Creates a recipe through the API and returns its detail representation.
    pub async fn create_recipe(&self, token: &str, title: &str, tags: &[&str], ingredients: &[&str]) -> Value {
        let tags: Vec<Value> = tags.iter().map(|name| serde_json::json!({ "name": name })).collect();
        let ingredients: Vec<Value> = ingredients
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect();

        let response = self
            .post(
                "/recipes/",
                token,
                serde_json::json!({
                    "title": title,
                    "time_minutes": 10,
                    "price": "5.00",
                    "tags": tags,
                    "ingredients": ingredients,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        response.body
    }
}

/// IDs of the `results` of a list response.
pub fn result_ids(body: &Value) -> Vec<i64> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect()
}

pub fn result_names(body: &Value) -> Vec<String> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect()
}

/// ID of the nested attribute called `name` in a recipe detail.
pub fn attribute_id(recipe: &Value, field: &str, name: &str) -> i64 {
    recipe[field]
        .as_array()
        .unwrap()
        .iter()
        .find(|attribute| attribute["name"] == name)
        .and_then(|attribute| attribute["id"].as_i64())
        .unwrap()
}
