//! Identity extraction
//!
//! Authentication happens in the fronting proxy, which forwards the
//! verified identity as headers. The extractor upserts the account on each
//! request, refreshing `last_signed_in`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tabuleiro_common::db::{User, UserProfile};

use super::{ApiError, ApiResult};
use crate::AppState;

pub const OPEN_ID_HEADER: &str = "x-open-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const LOGIN_METHOD_HEADER: &str = "x-login-method";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Profile asserted by the proxy, `None` without an open-id
pub fn profile_from_headers(headers: &HeaderMap) -> Option<UserProfile> {
    Some(UserProfile {
        open_id: header_value(headers, OPEN_ID_HEADER)?,
        name: header_value(headers, USER_NAME_HEADER),
        email: header_value(headers, USER_EMAIL_HEADER),
        login_method: header_value(headers, LOGIN_METHOD_HEADER),
    })
}

/// Signed-in user
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> ApiResult<Self> {
        let profile = profile_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Faça login para continuar".to_string()))?;

        let user = state.accounts.upsert_user(&profile).await?;
        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_profile_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(OPEN_ID_HEADER, HeaderValue::from_static("abc123"));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("ana@example.com"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("  "));

        let profile = profile_from_headers(&headers).unwrap();
        assert_eq!(profile.open_id, "abc123");
        assert_eq!(profile.email.as_deref(), Some("ana@example.com"));
        assert!(profile.name.is_none());
        assert!(profile.login_method.is_none());
    }

    #[test]
    fn test_missing_open_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("ana@example.com"));
        assert!(profile_from_headers(&headers).is_none());
    }
}
