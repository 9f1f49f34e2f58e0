//! Credential extraction from HTTP headers and cookies.
//!
//! Framework-agnostic string helpers: callers hand in raw header values and
//! get the token back, so the same logic serves any HTTP front end.

use crate::error::AuthError;
use crate::token::TokenClass;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "biblio_access_token";
/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "biblio_refresh_token";

/// Attributes every auth cookie is set with. Tokens never reach script
/// contexts and never travel cross-site.
pub const COOKIE_ATTRIBUTES: &str = "Path=/; HttpOnly; Secure; SameSite=Strict";

/// The cookie name for a token class.
pub fn cookie_name(class: TokenClass) -> &'static str {
    match class {
        TokenClass::Access => ACCESS_COOKIE,
        TokenClass::Refresh => REFRESH_COOKIE,
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Extracts a named cookie's value from a raw `Cookie` header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            Some(value)
        } else {
            None
        }
    })
}

/// Pulls a token of the given class out of the request headers.
///
/// The cookie wins when both carriers are present; the `Authorization`
/// header is the fallback for non-browser clients, and only for access
/// tokens. Refresh tokens travel exclusively by cookie.
pub fn extract_token<'a>(
    cookie_header: Option<&'a str>,
    authorization_header: Option<&'a str>,
    class: TokenClass,
) -> Result<&'a str, AuthError> {
    if let Some(token) = cookie_header.and_then(|h| cookie_value(h, cookie_name(class))) {
        return Ok(token);
    }
    if class == TokenClass::Access
        && let Some(token) = authorization_header.and_then(bearer_token)
    {
        return Ok(token);
    }
    Err(AuthError::MissingCredential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic dXNlcg=="), None);
    }

    #[test]
    fn test_cookie_value() {
        let header = "theme=dark; biblio_access_token=tok123; lang=en";
        assert_eq!(cookie_value(header, ACCESS_COOKIE), Some("tok123"));
        assert_eq!(cookie_value(header, REFRESH_COOKIE), None);
        assert_eq!(cookie_value("biblio_access_token=", ACCESS_COOKIE), None);
    }

    #[test]
    fn test_extract_prefers_cookie() {
        let cookies = "biblio_access_token=from_cookie";
        let token = extract_token(Some(cookies), Some("Bearer from_header"), TokenClass::Access);
        assert_eq!(token.unwrap(), "from_cookie");
    }

    #[test]
    fn test_extract_falls_back_to_bearer() {
        let token = extract_token(None, Some("Bearer from_header"), TokenClass::Access);
        assert_eq!(token.unwrap(), "from_header");
    }

    #[test]
    fn test_refresh_ignores_bearer() {
        let result = extract_token(None, Some("Bearer tok"), TokenClass::Refresh);
        assert!(matches!(result, Err(AuthError::MissingCredential)));
    }

    #[test]
    fn test_missing_credential() {
        let result = extract_token(None, None, TokenClass::Access);
        assert!(matches!(result, Err(AuthError::MissingCredential)));
    }
}
