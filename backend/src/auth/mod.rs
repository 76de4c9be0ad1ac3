use axum::http::{HeaderMap, header::AUTHORIZATION};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header")]
    InvalidHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;
    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeader)?;

    let (scheme, token) = auth_str
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidFormat)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }

    Ok(token)
}

#[cfg(test)]
mod tests;
