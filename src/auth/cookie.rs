use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::{Cookie, SameSite};
use anyhow::{Context, Result};

use super::jwt::SessionToken;

/// Extracts the raw credential from the session cookie. An empty value counts
/// as no credential.
pub fn credential_value(cookie: Option<Cookie<'_>>) -> Option<String> {
    cookie
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(name: &str, token: &SessionToken) -> Result<Cookie<'static>> {
    let expires = OffsetDateTime::from_unix_timestamp(token.expires_at as i64)
        .context("convert session expiry")?;
    Ok(build(name, token.token.clone(), expires))
}

/// The logout cookie: same name and attributes, empty value, expired one hour
/// before `now`.
pub fn expired_cookie(name: &str, now: u64) -> Result<Cookie<'static>> {
    let expires = OffsetDateTime::from_unix_timestamp(now as i64 - 3600)
        .context("convert logout expiry")?;
    Ok(build(name, String::new(), expires))
}

fn build(name: &str, value: String, expires: OffsetDateTime) -> Cookie<'static> {
    Cookie::build(name.to_string(), value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(expires)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie() {
        let token = SessionToken {
            token: String::from("abc.def.ghi"),
            expires_at: 1_700_086_400,
        };
        let cookie = session_cookie("blog-api-session", &token).unwrap();
        assert_eq!(cookie.name(), "blog-api-session");
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(1_700_086_400)
        );
    }

    #[test]
    fn test_expired_cookie() {
        let cookie = expired_cookie("blog-api-session", 1_700_000_000).unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(
            cookie.expires_datetime().map(|t| t.unix_timestamp()),
            Some(1_699_996_400)
        );
        assert_eq!(credential_value(Some(cookie)), None);
    }

    #[test]
    fn test_credential_value() {
        assert_eq!(credential_value(None), None);
        assert_eq!(
            credential_value(Some(Cookie::new("blog-api-session", "token"))),
            Some(String::from("token"))
        );
    }
}
