use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: Option<String>, // "access" or "refresh"
    pub exp: i64,
    pub iat: i64,
}

/// Caller identity set by [`authenticate`] and [`optional_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

fn sign(user_id: Uuid, email: &str, token_type: &str, expiry_secs: i64, secret: &str) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        token_type: Some(token_type.to_string()),
        exp: now + expiry_secs,
        iat: now,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Returns `(access_token, refresh_token)`.
pub fn generate_tokens(user_id: Uuid, email: &str, jwt: &JwtConfig) -> AppResult<(String, String)> {
    let access = sign(user_id, email, "access", jwt.access_expiry_secs, &jwt.secret)?;
    let refresh = sign(user_id, email, "refresh", jwt.refresh_expiry_secs, &jwt.secret)?;
    Ok((access, refresh))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

fn extract_bearer(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

fn auth_user_from(claims: Claims) -> AppResult<AuthUser> {
    if claims.token_type.as_deref() == Some("refresh") {
        return Err(AppError::Unauthorized("Access token required".into()));
    }
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token subject".into()))?;
    Ok(AuthUser {
        id,
        email: claims.email,
    })
}

/// Middleware: requires valid JWT. Sets AuthUser in extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(&req)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let claims = verify_token(&token, &state.config.jwt.secret)?;
    let user = auth_user_from(claims)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Middleware: sets AuthUser when a valid access token is present, lets
/// anonymous callers through otherwise.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = extract_bearer(&req)
        .and_then(|token| verify_token(&token, &state.config.jwt.secret).ok())
        .and_then(|claims| auth_user_from(claims).ok());
    if let Some(user) = user {
        req.extensions_mut().insert(user);
    }
    Ok(next.run(req).await)
}
