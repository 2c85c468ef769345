use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use irma_types::api::SessionClaims;

use crate::auth::AppState;
use crate::blocking;
use crate::error::AppError;
use crate::validate;

pub const SESSION_COOKIE: &str = "irma_session";

/// The logged-in user, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

/// Resolve the session cookie to a live server-side session. Anything else
/// is redirected to the login page with the requested path as `next`.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &jar).await? else {
        let target = login_redirect(req.uri().path());
        return Ok(Redirect::to(&target).into_response());
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn current_user(state: &AppState, jar: &CookieJar) -> Result<Option<CurrentUser>, AppError> {
    let Some(session_id) = session_id(&state.settings.session_secret, jar) else {
        return Ok(None);
    };

    let sid = session_id.to_string();
    let username = blocking(state, move |db| Ok(db.session_user(&sid)?)).await?;
    if username.is_none() {
        debug!("Session {} is unknown or expired", session_id);
    }

    Ok(username.map(|username| CurrentUser { username }))
}

/// Session id named by a validly signed, unexpired cookie.
pub fn session_id(secret: &str, jar: &CookieJar) -> Option<Uuid> {
    let token = jar.get(SESSION_COOKIE)?;
    decode::<SessionClaims>(
        token.value(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims.sid)
}

pub fn issue_token(secret: &str, session_id: Uuid, ttl_hours: u64) -> anyhow::Result<String> {
    let claims = SessionClaims {
        sid: session_id,
        exp: (chrono::Utc::now() + chrono::Duration::hours(ttl_hours as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

fn login_redirect(path: &str) -> String {
    format!("/login?next={}", validate::percent_encode(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_keeps_plain_paths() {
        assert_eq!(login_redirect("/market/3/buy"), "/login?next=/market/3/buy");
        assert_eq!(login_redirect("/profile/a b&c"), "/login?next=/profile/a%20b%26c");
    }

    #[test]
    fn token_round_trips_through_cookie() {
        let sid = Uuid::new_v4();
        let token = issue_token("secret", sid, 1).unwrap();
        let jar = CookieJar::new().add(session_cookie(token, false));

        assert_eq!(session_id("secret", &jar), Some(sid));
        assert_eq!(session_id("other-secret", &jar), None);
    }

    #[test]
    fn missing_or_garbage_cookie_has_no_session() {
        assert_eq!(session_id("secret", &CookieJar::new()), None);
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "not-a-jwt"));
        assert_eq!(session_id("secret", &jar), None);
    }
}
