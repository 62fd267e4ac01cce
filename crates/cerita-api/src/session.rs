use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::http::{HeaderMap, HeaderValue, header};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use uuid::Uuid;

use cerita_types::Role;
use cerita_types::api::Claims;

use crate::state::AuthConfig;

pub const SESSION_COOKIE: &str = "auth-token";
const SESSION_DAYS: i64 = 7;

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// False for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// `None` when the signature, expiry or shape is wrong.
pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Session token from the cookie, falling back to a Bearer header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

pub fn session_cookie(config: &AuthConfig, token: &str) -> HeaderValue {
    cookie_header(config, token, SESSION_DAYS * 24 * 60 * 60)
}

pub fn clear_session_cookie(config: &AuthConfig) -> HeaderValue {
    cookie_header(config, "", 0)
}

fn cookie_header(config: &AuthConfig, value: &str, max_age: i64) -> HeaderValue {
    let mut cookie = format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    // JWTs and the empty string are plain ASCII
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("auth-token=; Path=/; Max-Age=0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secure: bool) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            cookie_secure: secure,
        }
    }

    #[test]
    fn token_roundtrips_claims() {
        let id = Uuid::new_v4();
        let token = create_token("test-secret", id, "guru@sekolah.id", Role::Teacher).unwrap();

        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Teacher);
        assert!(decode_token("other-secret", &token).is_none());
        assert!(decode_token("test-secret", "not-a-jwt").is_none());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("rahasia").unwrap();
        assert!(verify_password("rahasia", &hash));
        assert!(!verify_password("salah", &hash));
        assert!(!verify_password("rahasia", "garbage"));
    }

    #[test]
    fn each_hash_gets_a_fresh_salt() {
        let first = hash_password("rahasia").unwrap();
        let second = hash_password("rahasia").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("rahasia", &second));
    }

    #[test]
    fn cookie_prefers_cookie_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth-token=from-cookie"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn cookie_attributes() {
        let value = session_cookie(&config(true), "abc");
        let value = value.to_str().unwrap();
        assert!(value.starts_with("auth-token=abc;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=604800"));
        assert!(value.ends_with("; Secure"));

        let cleared = clear_session_cookie(&config(false));
        assert_eq!(cleared.to_str().unwrap(), "auth-token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    }
}
