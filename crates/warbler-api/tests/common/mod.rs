#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use warbler_api::auth::{AppState, AppStateInner, hash_password};
use warbler_api::routes;
use warbler_api::session::{SESSION_COOKIE, SessionData, encode_session};
use warbler_db::Database;
use warbler_db::models::{MessageRow, NewUser, UserRow};

pub const SECRET: &str = "test-secret";
pub const PASSWORD: &str = "testpassword";

/// Argon2 is slow in debug builds; hash the shared test password once.
fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).unwrap())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

/// The router over a fresh in-memory store, plus a one-cookie jar so a
/// sequence of requests behaves like one browser.
pub struct TestApp {
    pub state: AppState,
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    pub fn new() -> Self {
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            session_secret: SECRET.into(),
        });
        Self {
            router: routes::router(state.clone()),
            state,
            cookie: None,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn user(&self, username: &str) -> UserRow {
        self.db()
            .create_user(&NewUser {
                username,
                email: &format!("{username}@example.com"),
                password_hash: password_hash(),
                image_url: None,
            })
            .unwrap()
    }

    pub fn message(&self, user: &UserRow, text: &str) -> MessageRow {
        self.db().insert_message(user.id, text).unwrap()
    }

    /// Put `user_id` in the session as if they had logged in.
    pub fn login_as(&mut self, user_id: Uuid) {
        let data = SessionData {
            curr_user: Some(user_id),
            ..Default::default()
        };
        let token = encode_session(SECRET, &data).unwrap();
        self.cookie = Some(format!("{SESSION_COOKIE}={token}"));
    }

    pub fn set_raw_cookie(&mut self, cookie: &str) {
        self.cookie = Some(cookie.to_string());
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&mut self, path: &str, form: &str) -> TestResponse {
        self.send(Method::POST, path, Some(form)).await
    }

    /// Follow redirects with GET until a non-redirect response.
    pub async fn follow(&mut self, mut resp: TestResponse) -> TestResponse {
        while resp.status.is_redirection() {
            let location = resp.location.clone().expect("redirect without Location");
            resp = self.get(&location).await;
        }
        resp
    }

    async fn send(&mut self, method: Method, path: &str, form: Option<&str>) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match form {
            Some(form) => req
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();

        if let Some(set_cookie) = resp.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = resp.status();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            location,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}
