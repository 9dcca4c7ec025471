use axum::{
    extract::{FromRequestParts, State},
    http::{
        header::{self, InvalidHeaderValue},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sigforge_storage::{
    AdminSession, AdminUserError, Database, NewAdminUser, SessionError,
};
use sigforge_util::AdminSeed;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{error, info, warn};
use ulid::Ulid;

use crate::pages;
use crate::problem::{internal_error, ProblemResponse};
use crate::router::AppState;

pub const SESSION_COOKIE: &str = "sigforge_session";
pub const LOGIN_PATH: &str = "/admin";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";
const COOKIE_PATH: &str = "/admin";
const SALT_LEN: usize = 16;
const INVALID_CREDENTIALS: &str = "Invalid email or password. Please try again.";
const LOGIN_FAILED: &str = "Login failed. Please try again.";

const HASH_SCHEME: &str = "pbkdf2-sha256";
const HASH_LEN: usize = 32;
#[cfg(not(test))]
const PBKDF2_ROUNDS: u32 = 600_000;
// Lower cost under test; the stored hash records its own round count.
#[cfg(test)]
const PBKDF2_ROUNDS: u32 = 1_000;

// Checked when the email is unknown so both failure paths do the same work.
const DUMMY_SALT: &str = "00000000000000000000000000000000";

/// Salted password digest stored for an admin account.
///
/// `hash` is `pbkdf2-sha256$<rounds>$<hex>`; the salt is hex in its own column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub salt: String,
    pub hash: String,
}

pub fn hash_password(password: &str) -> PasswordDigest {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let hash = derive_key(password, &salt, PBKDF2_ROUNDS);
    PasswordDigest {
        salt: hex::encode(salt),
        hash: format!("{HASH_SCHEME}${PBKDF2_ROUNDS}${}", hex::encode(hash)),
    }
}

pub fn verify_password(password: &str, salt_hex: &str, stored_hash: &str) -> bool {
    let Some((rounds, expected)) = parse_stored_hash(stored_hash) else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let actual = derive_key(password, &salt, rounds);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

fn parse_stored_hash(stored: &str) -> Option<(u32, Vec<u8>)> {
    let mut parts = stored.splitn(3, '$');
    if parts.next()? != HASH_SCHEME {
        return None;
    }
    let rounds = parts.next()?.parse::<u32>().ok().filter(|rounds| *rounds > 0)?;
    let hash = hex::decode(parts.next()?).ok()?;
    Some((rounds, hash))
}

fn derive_key(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}

fn dummy_hash() -> String {
    format!("{HASH_SCHEME}${PBKDF2_ROUNDS}${}", "00".repeat(HASH_LEN))
}

/// Creates the configured admin account or resets its password.
pub async fn provision_admin(
    database: &Database,
    seed: &AdminSeed,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let digest = hash_password(&seed.password);
    database
        .admin_users()
        .upsert(&NewAdminUser {
            email: &seed.email,
            password_salt: &digest.salt,
            password_hash: &digest.hash,
            updated_at: now,
        })
        .await?;
    info!(stage = "auth", email = %seed.email, "admin account provisioned");
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies the signed session cookie.
#[derive(Clone)]
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionTokens {
    pub fn new(secret: &[u8], ttl: std::time::Duration, secure_cookie: bool) -> Self {
        // Expiry is checked against the application clock instead of the system time.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365)),
            secure_cookie,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, session: &AdminSession) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: session.admin_email.clone(),
            sid: session.id.clone(),
            iat: session.created_at.timestamp(),
            exp: session.expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))
    }

    /// Verifies the signature only; used where an expired token is still useful.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let claims = self.decode(token)?;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::SessionExpired);
        }
        Ok(claims)
    }

    pub fn session_cookie(&self, token: &str) -> Result<HeaderValue, AuthError> {
        let value = format!(
            "{SESSION_COOKIE}={token}; Path={COOKIE_PATH}; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.ttl.num_seconds(),
            self.secure_suffix()
        );
        Ok(HeaderValue::from_str(&value)?)
    }

    pub fn clear_cookie(&self) -> HeaderValue {
        let value = format!(
            "{SESSION_COOKIE}=; Path={COOKIE_PATH}; HttpOnly; SameSite=Lax; Max-Age=0{}",
            self.secure_suffix()
        );
        HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""))
    }

    fn secure_suffix(&self) -> &'static str {
        if self.secure_cookie {
            "; Secure"
        } else {
            ""
        }
    }
}

/// Extracts the session token from the request cookies.
pub fn read_session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

/// The signed-in admin behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub email: String,
    pub session_id: String,
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AdminIdentity, AuthError> {
    let token = read_session_cookie(headers).ok_or(AuthError::MissingSession)?;
    let now = state.now();
    let claims = state.sessions().validate(token, now)?;
    let session = state
        .storage()
        .admin_sessions()
        .fetch_active(&claims.sid, now)
        .await?
        .ok_or(AuthError::SessionRevoked)?;

    if session.admin_email != claims.sub {
        return Err(AuthError::InvalidToken("subject_mismatch".to_string()));
    }

    Ok(AdminIdentity {
        email: session.admin_email,
        session_id: session.id,
    })
}

/// Admin gate for HTML pages; unauthenticated visitors are sent to the login page.
pub struct AdminPage(pub AdminIdentity);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminPage {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authenticate(state, &parts.headers).await {
            Ok(identity) => Ok(Self(identity)),
            Err(err) if err.is_unauthenticated() => Err(Redirect::to(LOGIN_PATH).into_response()),
            Err(err) => {
                error!(stage = "auth", error = %err, "failed to verify admin session");
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(pages::error_page("Something went wrong. Please try again.")),
                )
                    .into_response())
            }
        }
    }
}

/// Admin gate for JSON and clipboard endpoints.
pub struct AdminApi(pub AdminIdentity);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminApi {
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authenticate(state, &parts.headers).await {
            Ok(identity) => Ok(Self(identity)),
            Err(err) if err.is_unauthenticated() => Err(ProblemResponse::new(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "an admin session is required",
            )),
            Err(err) => {
                error!(stage = "auth", error = %err, "failed to verify admin session");
                Err(internal_error("failed to verify session"))
            }
        }
    }
}

pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if authenticate(&state, &headers).await.is_ok() {
        return Redirect::to(DASHBOARD_PATH).into_response();
    }
    Html(pages::login_page(None, "")).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match sign_in(&state, &form.email, &form.password).await {
        Ok(token) => {
            let cookie = match state.sessions().session_cookie(&token) {
                Ok(cookie) => cookie,
                Err(err) => return login_failure(&form.email, err),
            };
            counter!("admin_login_total", "result" => "ok").increment(1);
            info!(stage = "auth", email = %form.email.trim(), "admin signed in");
            let mut response = Redirect::to(DASHBOARD_PATH).into_response();
            response.headers_mut().insert(header::SET_COOKIE, cookie);
            response
        }
        Err(err) => login_failure(&form.email, err),
    }
}

fn login_failure(email: &str, err: AuthError) -> Response {
    if matches!(err, AuthError::InvalidCredentials) {
        counter!("admin_login_total", "result" => "invalid").increment(1);
        warn!(stage = "auth", email = %email.trim(), "admin login rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Html(pages::login_page(Some(INVALID_CREDENTIALS), email)),
        )
            .into_response();
    }

    counter!("admin_login_total", "result" => "error").increment(1);
    error!(stage = "auth", error = %err, "admin login failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(pages::login_page(Some(LOGIN_FAILED), email)),
    )
        .into_response()
}

async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<String, AuthError> {
    let credentials = state
        .storage()
        .admin_users()
        .fetch_credentials(email)
        .await?;

    let Some(credentials) = credentials else {
        verify_password(password, DUMMY_SALT, &dummy_hash());
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(
        password,
        &credentials.password_salt,
        &credentials.password_hash,
    ) {
        return Err(AuthError::InvalidCredentials);
    }

    let now = state.now();
    let session = AdminSession {
        id: Ulid::new().to_string(),
        admin_email: credentials.email,
        created_at: now,
        expires_at: now + state.sessions().ttl(),
    };
    state.storage().admin_sessions().insert(&session).await?;
    state.sessions().issue(&session)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(claims) = read_session_cookie(&headers).and_then(|token| state.sessions().decode(token).ok()) {
        match state.storage().admin_sessions().delete(&claims.sid).await {
            Ok(_) => info!(stage = "auth", email = %claims.sub, "admin signed out"),
            Err(err) => error!(stage = "auth", error = %err, "failed to delete admin session"),
        }
    }

    let mut response = Redirect::to(LOGIN_PATH).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, state.sessions().clear_cookie());
    response
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no session cookie present")]
    MissingSession,
    #[error("invalid session token: {0}")]
    InvalidToken(String),
    #[error("session token expired")]
    SessionExpired,
    #[error("session was revoked or has expired")]
    SessionRevoked,
    #[error("failed to build session cookie: {0}")]
    Cookie(#[from] InvalidHeaderValue),
    #[error("failed to load admin account: {0}")]
    Users(#[from] AdminUserError),
    #[error("failed to access admin session: {0}")]
    Sessions(#[from] SessionError),
}

impl AuthError {
    /// Returns `true` when the request simply lacks a usable session.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::MissingSession | Self::InvalidToken(_) | Self::SessionExpired | Self::SessionRevoked
        )
    }
}
