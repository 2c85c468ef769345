use axum::{Extension, Json, extract::State};

use irma_types::models::Purchase;

use crate::auth::AppState;
use crate::blocking;
use crate::error::AppError;
use crate::middleware::CurrentUser;

/// GET /history: the caller's purchases, newest first.
pub async fn list_history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    let rows = blocking(&state, move |db| Ok(db.list_history(&user.username)?)).await?;
    Ok(Json(rows.into_iter().map(Purchase::from).collect()))
}
