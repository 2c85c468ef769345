pub mod auth;
pub mod board;
pub mod error;
pub mod extract;
pub mod history;
pub mod market;
pub mod middleware;
pub mod pages;
pub mod profile;
pub mod store;
pub mod validate;

use axum::{
    Router,
    routing::{get, post},
};
use irma_db::Database;

use crate::auth::AppState;
use crate::error::AppError;

/// Builds the full application router. Everything except the login,
/// registration and logout endpoints sits behind the session gate.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/", get(profile::index))
        .route("/board", get(board::list_posts))
        .route("/board/new", get(board::new_post_page).post(board::create_post))
        .route("/store", get(store::list_goods))
        .route("/store/{id}/buy", post(store::buy))
        .route("/market", get(market::list_market))
        .route("/market/new", get(market::new_listing_page).post(market::create_listing))
        .route("/market/{id}/edit", post(market::edit_listing))
        .route("/market/{id}/buy", post(market::buy_listing))
        .route("/market/{id}/donate", post(market::donate))
        .route("/profile/edit", get(profile::edit_profile_page).post(profile::edit_profile))
        .route(
            "/profile/{username}",
            get(profile::view_profile).post(profile::view_profile),
        )
        .route("/history", get(history::list_history))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Runs database (or other blocking) work off the async executor.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
}
