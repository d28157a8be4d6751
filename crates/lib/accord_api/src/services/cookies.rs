//! Login-nonce cookie binding an OAuth redirect to the caller's browser.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use accord_core::auth::state::STATE_TTL;

/// Cookie name for the pending OAuth nonce.
pub const NONCE_COOKIE: &str = "accord_oauth_nonce";

/// Build a httpOnly cookie holding `nonce` for the lifetime of a pending login.
pub fn nonce_cookie(nonce: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((NONCE_COOKIE, nonce.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(STATE_TTL.as_secs() as i64))
        .build()
}

/// Build an expired nonce cookie.
pub fn clear_nonce_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((NONCE_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_cookie_attributes() {
        let cookie = nonce_cookie("abc", true);
        assert_eq!(cookie.name(), NONCE_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::minutes(10)));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_nonce_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
