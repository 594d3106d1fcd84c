// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    engine::scope::{CallerContext, Role},
    error::AppError,
};

/// JWT Claims structure, issued by the identity service.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user id (as string).
    pub sub: String,
    /// 'admin', 'teacher' or 'student'.
    pub role: String,
    /// Teacher id, when it differs from `sub`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    /// Currently selected class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl TryFrom<&Claims> for CallerContext {
    type Error = AppError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let role = Role::parse(&claims.role)
            .ok_or_else(|| AppError::AuthError(format!("Unknown role '{}'", claims.role)))?;
        // An unparseable subject leaves the caller unscoped rather than rejected.
        let subject = claims.sub.parse::<i64>().ok();

        Ok(match role {
            Role::Admin => CallerContext {
                role,
                teacher_id: claims.teacher_id,
                class_id: claims.class_id,
                student_id: None,
            },
            Role::Teacher => CallerContext {
                role,
                teacher_id: claims.teacher_id.or(subject),
                class_id: claims.class_id,
                student_id: None,
            },
            Role::Student => CallerContext {
                role,
                teacher_id: None,
                class_id: claims.class_id,
                student_id: subject,
            },
        })
    }
}

/// Signs a token for the given claims body.
pub fn sign_jwt(
    sub: &str,
    role: &str,
    teacher_id: Option<i64>,
    class_id: Option<i64>,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: sub.to_owned(),
        role: role.to_owned(),
        teacher_id,
        class_id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects the
/// resolved `CallerContext` into the request extensions.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let caller = verify_jwt(token, &config.jwt_secret)
        .and_then(|claims| CallerContext::try_from(&claims))
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Axum Middleware: Staff Authorization.
///
/// Must be used AFTER `auth_middleware`. Lets admins and teachers through.
/// Otherwise returns 403 Forbidden.
pub async fn staff_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let caller = req
        .extensions()
        .get::<CallerContext>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !caller.role.is_staff() {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}
