use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::info;

use irma_types::api::EditProfileForm;
use irma_types::models::Profile;

use crate::auth::{AppState, verify_password};
use crate::blocking;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::pages;
use crate::validate;

/// GET /: the logged-in user's profile.
pub async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Profile>, AppError> {
    load_profile(&state, user.username).await.map(Json)
}

/// GET|POST /profile/{username}. Profiles are private; asking for someone
/// else's redirects to your own.
pub async fn view_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    if username != user.username {
        return Ok(Redirect::to(&format!("/profile/{}", validate::percent_encode(&user.username))).into_response());
    }
    Ok(Json(load_profile(&state, username).await?).into_response())
}

pub async fn edit_profile_page() -> Html<&'static str> {
    Html(pages::EDIT_PROFILE)
}

/// POST /profile/edit: change email and optionally username, confirmed by
/// the current password. The session follows a rename.
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<EditProfileForm>,
) -> Result<Json<Profile>, AppError> {
    let email = validate::required(form.email, "email")?;
    let password = validate::required(form.password, "password")?;
    let new_username = match validate::optional(form.edit_username) {
        Some(name) => {
            validate::username(&name)?;
            name
        }
        None => user.username.clone(),
    };

    let current = user.username.clone();
    let profile = blocking(&state, move |db| {
        let row = db.get_user(&current)?.ok_or(AppError::NotFound)?;
        if !verify_password(&password, &row.password_hash)? {
            return Err(AppError::validation("password does not match"));
        }
        if !db.update_profile(&current, &new_username, &email)? {
            return Err(AppError::Conflict("username already exists".into()));
        }
        let row = db.get_user(&new_username)?.ok_or(AppError::NotFound)?;
        Ok(Profile::from(row))
    })
    .await?;

    if profile.username != user.username {
        info!("{} renamed to {}", user.username, profile.username);
    }
    Ok(Json(profile))
}

async fn load_profile(state: &AppState, username: String) -> Result<Profile, AppError> {
    let row = blocking(state, move |db| Ok(db.get_user(&username)?))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Profile::from(row))
}
