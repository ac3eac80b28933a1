//! Common test utilities for API tests
//!
//! This module provides shared infrastructure for the endpoint tests:
//! - A router over the in-memory store and the mock image host
//! - Session cookie capture
//! - Account helpers (register + login)
//! - A small multipart body builder

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tasknest_api::app::{build_router, AppState, SESSION_COOKIE};
use tasknest_api::config::Config;
use tasknest_shared::images::MockImageHost;
use tasknest_shared::store::MemoryStore;
use tower::Service as _;
use uuid::Uuid;

pub const BOUNDARY: &str = "tasknest-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub images: Arc<MockImageHost>,
    pub config: Config,
}

/// Response parts tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` of the session cookie set by this response, if any
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{}=", SESSION_COOKIE)))
            .map(str::to_string)
    }
}

/// A logged-in account
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub cookie: String,
}

impl TestContext {
    /// Creates a fresh app with empty storage
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let images = Arc::new(MockImageHost::new());
        let config = Config::local();

        let state = AppState::new(store.clone(), images.clone(), config.clone());
        let app = build_router(state);

        TestContext {
            app,
            store,
            images,
            config,
        }
    }

    /// Sends a request and decodes the JSON body (`Null` when empty)
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// JSON request, optionally carrying a session cookie
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Request without a body
    pub async fn empty(&self, method: &str, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Multipart request built with [`MultipartBody`]
    pub async fn multipart(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: MultipartBody,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.finish())).unwrap())
            .await
    }

    /// Registers a user and returns the response
    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.json(
            "POST",
            "/register",
            None,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Logs in and returns the response
    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.json(
            "POST",
            "/login",
            None,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Registers and logs in a new account
    pub async fn account(&self, username: &str) -> Account {
        let password = format!("{}-pw", username);

        let registered = self.register(username, &password).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);
        let id: Uuid = serde_json::from_value(registered.body["user"]["id"].clone()).unwrap();

        let login = self.login(username, &password).await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);
        let cookie = login.session_cookie().expect("login sets a session cookie");

        Account {
            id,
            username: username.to_string(),
            cookie,
        }
    }

    /// Creates a task for an account and returns its JSON
    pub async fn create_task(&self, account: &Account, title: &str) -> Value {
        let response = self
            .json("POST", "/tasks", Some(&account.cookie), json!({ "title": title }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Uploads a profile image for an account and returns the record JSON
    pub async fn upload_profile_image(&self, account: &Account) -> Value {
        let body = MultipartBody::new()
            .text("student", &account.id.to_string())
            .file("image", "me.png", "image/png", b"\x89PNG\r\n\x1a\nfake");
        let response = self
            .multipart("POST", "/profile", Some(&account.cookie), body)
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"].clone()
    }
}

/// Builds a `multipart/form-data` body using [`BOUNDARY`]
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.bytes
    }
}
