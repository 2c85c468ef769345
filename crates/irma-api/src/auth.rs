use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};
use uuid::Uuid;

use irma_db::Database;
use irma_types::api::{LoginForm, LoginQuery, RegisterForm};

use crate::blocking;
use crate::error::AppError;
use crate::middleware::{self, SESSION_COOKIE};
use crate::pages;
use crate::validate;

pub type AppState = Arc<AppStateInner>;

/// Verified against when the username is unknown, so a failed login costs
/// the same argon2 work whether or not the account exists.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$utQ2X++xVxHA9DDLBGJeCw$mYHkwnexq6TgpZQUkOnX84F5Klx9sn8Xr6EeTDz0Y3o";

pub struct AppStateInner {
    pub db: Database,
    pub settings: Settings,
}

/// Runtime knobs the handlers need; loaded by the server binary.
#[derive(Debug, Clone)]
pub struct Settings {
    pub session_secret: String,
    pub session_ttl_hours: u64,
    /// The only user allowed to publish board posts.
    pub admin_username: String,
    /// Balance credited to newly registered users.
    pub signup_balance: i64,
    pub secure_cookies: bool,
}

pub async fn login_page() -> Html<&'static str> {
    Html(pages::LOGIN)
}

pub async fn register_page() -> Html<&'static str> {
    Html(pages::REGISTER)
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let username = validate::required(form.username, "username")?;
    let password = validate::required(form.password, "password")?;

    let name = username.clone();
    let verified = blocking(&state, move |db| {
        let Some(user) = db.get_user(&name)? else {
            verify_password(&password, UNKNOWN_USER_HASH)?;
            return Ok(false);
        };
        verify_password(&password, &user.password_hash)
    })
    .await?;

    if !verified {
        warn!("Failed login for '{}'", username);
        return Err(AppError::Unauthorized);
    }

    let jar = start_session(&state, jar, &username).await?;
    info!("{} logged in", username);

    let target = validate::local_redirect(query.next.as_deref());
    Ok((jar, Redirect::to(target)))
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let username = validate::required(form.username, "username")?;
    let password = validate::required(form.password, "password")?;
    let email = validate::required(form.email, "email")?;
    validate::username(&username)?;

    let name = username.clone();
    let balance = state.settings.signup_balance;
    let created = blocking(&state, move |db| {
        let password_hash = hash_password(&password)?;
        Ok(db.create_user(&name, &password_hash, &email, balance)?)
    })
    .await?;

    if !created {
        return Err(AppError::Conflict("username already exists".into()));
    }

    let jar = start_session(&state, jar, &username).await?;
    info!("Registered {}", username);

    Ok((jar, Redirect::to("/")))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(session_id) = middleware::session_id(&state.settings.session_secret, &jar) {
        let sid = session_id.to_string();
        if let Err(e) = blocking(&state, move |db| Ok(db.delete_session(&sid)?)).await {
            warn!("Failed to delete session {}: {}", session_id, e);
        }
    }

    let jar = if jar.get(SESSION_COOKIE).is_some() {
        jar.remove(middleware::expired_session_cookie())
    } else {
        jar
    };
    (jar, Redirect::to("/login"))
}

/// Creates a server-side session for `username` and sets its cookie.
async fn start_session(state: &AppState, jar: CookieJar, username: &str) -> Result<CookieJar, AppError> {
    let session_id = Uuid::new_v4();
    let ttl_hours = state.settings.session_ttl_hours;

    let sid = session_id.to_string();
    let name = username.to_string();
    blocking(state, move |db| Ok(db.create_session(&sid, &name, ttl_hours)?)).await?;

    let token = middleware::issue_token(&state.settings.session_secret, session_id, ttl_hours)?;
    Ok(jar.add(middleware::session_cookie(token, state.settings.secure_cookies)))
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is unreadable: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
