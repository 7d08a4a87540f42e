//! Cookie-backed session.
//!
//! The whole session lives client-side in one cookie holding an HS256 JWT,
//! signed with the server secret. A missing, tampered or expired cookie
//! reads as an empty session.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use warbler_types::flash::{FlashLevel, FlashMessage};

use crate::auth::AppState;

pub const SESSION_COOKIE: &str = "warbler_session";

const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Id of the logged-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_user: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<FlashMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    data: SessionData,
    exp: usize,
}

pub fn encode_session(secret: &str, data: &SessionData) -> anyhow::Result<String> {
    let claims = SessionClaims {
        data: data.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_session(secret: &str, token: &str) -> Option<SessionData> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.data)
    .map_err(|e| debug!("Discarding session cookie: {}", e))
    .ok()
}

/// Request-scoped session. Extract it in a handler, mutate it, and return it
/// as part of the response so the cookie is rewritten.
pub struct Session {
    data: SessionData,
    secret: String,
    changed: bool,
}

impl Session {
    pub fn new(secret: impl Into<String>, data: SessionData) -> Self {
        Self {
            data,
            secret: secret.into(),
            changed: false,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.data.curr_user
    }

    pub fn login(&mut self, user_id: Uuid) {
        self.data.curr_user = Some(user_id);
        self.changed = true;
    }

    pub fn logout(&mut self) {
        self.data.curr_user = None;
        self.changed = true;
    }

    pub fn flash(&mut self, level: FlashLevel, text: impl Into<String>) {
        self.data.flashes.push(FlashMessage::new(level, text));
        self.changed = true;
    }

    /// Drains pending flashes; they are shown exactly once.
    pub fn take_flashes(&mut self) -> Vec<FlashMessage> {
        if !self.data.flashes.is_empty() {
            self.changed = true;
        }
        std::mem::take(&mut self.data.flashes)
    }

    fn cookie(&self) -> anyhow::Result<Cookie<'static>> {
        let token = encode_session(&self.secret, &self.data)?;
        Ok(Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build())
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let data = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| decode_session(&state.session_secret, cookie.value()))
            .unwrap_or_default();

        Ok(Self::new(state.session_secret.clone(), data))
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if !self.changed {
            return Ok(res);
        }

        let jar = match self.cookie() {
            Ok(cookie) => CookieJar::new().add(cookie),
            Err(e) => {
                error!("Failed to encode session cookie: {}", e);
                CookieJar::new()
            }
        };
        jar.into_response_parts(res)
    }
}
