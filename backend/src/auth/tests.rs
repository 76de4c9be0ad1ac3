use super::*;
use axum::http::HeaderValue;

fn headers_with(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
    headers
}

#[test]
fn test_bearer_token_success() {
    let headers = headers_with("Bearer eyJhbGciOiJIUzI1NiJ9.payload.sig");
    assert_eq!(
        bearer_token(&headers),
        Ok("eyJhbGciOiJIUzI1NiJ9.payload.sig")
    );
}

#[test]
fn test_bearer_scheme_is_case_insensitive() {
    let headers = headers_with("bearer abc");
    assert_eq!(bearer_token(&headers), Ok("abc"));
}

#[test]
fn test_bearer_token_missing_header() {
    assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader));
}

#[test]
fn test_bearer_token_wrong_scheme() {
    let headers = headers_with("Basic dXNlcjpwYXNz");
    assert_eq!(bearer_token(&headers), Err(AuthError::InvalidFormat));
}

#[test]
fn test_bearer_token_empty_token() {
    for value in ["Bearer", "Bearer ", "Bearer    "] {
        let headers = headers_with(value);
        assert_eq!(
            bearer_token(&headers),
            Err(AuthError::InvalidFormat),
            "header: {value:?}"
        );
    }
}

#[test]
fn test_bearer_token_non_ascii_header() {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
    );
    assert_eq!(bearer_token(&headers), Err(AuthError::InvalidHeader));
}
