use axum::{
    Extension, Form, Json,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use irma_types::api::NewPostForm;
use irma_types::models::Post;

use crate::auth::AppState;
use crate::blocking;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::pages;
use crate::validate;

/// GET /board: every post, ordered by title.
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    let rows = blocking(&state, |db| Ok(db.list_posts()?)).await?;
    Ok(Json(rows.into_iter().map(Post::from).collect()))
}

pub async fn new_post_page(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Response {
    if user.username != state.settings.admin_username {
        return Redirect::to("/").into_response();
    }
    Html(pages::NEW_POST).into_response()
}

/// POST /board/new: admin only; anyone else is sent back to the index.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<NewPostForm>,
) -> Result<Redirect, AppError> {
    if user.username != state.settings.admin_username {
        warn!("{} tried to post without admin rights", user.username);
        return Ok(Redirect::to("/"));
    }

    let title = validate::required(form.title, "title")?;
    let content = validate::optional(form.content);

    let author = user.username;
    let id = blocking(&state, move |db| {
        Ok(db.insert_post(&title, content.as_deref(), &author)?)
    })
    .await?;

    info!("Post {} published", id);
    Ok(Redirect::to("/board"))
}
