use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{NaiveDateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

/// Identity carried by a verified bearer token. Tokens are stateless: the
/// claims hold everything the handlers need, so verification never touches
/// the database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid JWT_EXPIRES_IN")]
    InvalidExpiresIn,
}

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: String,
    email: String,
    role: String,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string())
}

fn mac_for(secret: &str) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

pub fn verify_token(token: &str) -> Result<AuthUser, AuthError> {
    decode_hs256(token, &jwt_secret())
}

fn decode_hs256(token: &str, secret: &str) -> Result<AuthUser, AuthError> {
    let (head, rest) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
    let (body, tag) = rest.split_once('.').ok_or(AuthError::InvalidToken)?;
    if tag.contains('.') {
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(head)
        .map_err(|_| AuthError::InvalidToken)?;
    let header: JwtHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    if header.alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    let tag_bytes = URL_SAFE_NO_PAD
        .decode(tag)
        .map_err(|_| AuthError::InvalidToken)?;
    let mut mac = mac_for(secret)?;
    mac.update(head.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    mac.verify_slice(&tag_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let claim_bytes = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|_| AuthError::InvalidToken)?;
    let claims: Claims =
        serde_json::from_slice(&claim_bytes).map_err(|_| AuthError::InvalidToken)?;

    let now = Utc::now().timestamp();
    if now >= claims.exp || claims.nbf.is_some_and(|nbf| now < nbf) {
        return Err(AuthError::InvalidToken);
    }

    Ok(AuthUser {
        id: claims.user_id,
        email: claims.email,
        role: claims.role,
    })
}

pub fn sign_jwt_for_user(user_id: &str, email: &str, role: &str) -> Result<String, AuthError> {
    let lifetime = std::env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "7d".to_string());
    let lifetime_ms = parse_expires_in_ms(&lifetime)?;

    let issued_at = Utc::now();
    let expires_at = issued_at
        .checked_add_signed(chrono::Duration::milliseconds(lifetime_ms))
        .ok_or(AuthError::InvalidExpiresIn)?;

    let claims = Claims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
        nbf: None,
    };

    let head = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD
        .encode(serde_json::to_vec(&claims).map_err(|_| AuthError::InvalidToken)?);
    let message = format!("{head}.{body}");

    let mut mac = mac_for(&jwt_secret())?;
    mac.update(message.as_bytes());
    let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{message}.{tag}"))
}

/// Parses lifetimes written as `<digits><unit>`, e.g. `90m` or `7d`.
pub fn parse_expires_in_ms(value: &str) -> Result<i64, AuthError> {
    let spec = value.trim();
    let unit = spec.chars().last().ok_or(AuthError::InvalidExpiresIn)?;
    let digits = &spec[..spec.len() - unit.len_utf8()];

    let amount: i64 = digits.parse().map_err(|_| AuthError::InvalidExpiresIn)?;
    if amount <= 0 {
        return Err(AuthError::InvalidExpiresIn);
    }

    let unit_ms: i64 = match unit {
        's' => 1_000,
        'm' => 60_000,
        'h' => 3_600_000,
        'd' => 86_400_000,
        _ => return Err(AuthError::InvalidExpiresIn),
    };
    amount
        .checked_mul(unit_ms)
        .ok_or(AuthError::InvalidExpiresIn)
}

pub fn format_naive_datetime_iso_millis(value: NaiveDateTime) -> String {
    value.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
}
