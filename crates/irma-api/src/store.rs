use axum::{
    Extension, Json,
    extract::State,
    response::Redirect,
};
use tracing::warn;

use irma_types::models::Goods;

use crate::auth::AppState;
use crate::blocking;
use crate::error::AppError;
use crate::extract::ItemId;
use crate::middleware::CurrentUser;

pub async fn list_goods(State(state): State<AppState>) -> Result<Json<Vec<Goods>>, AppError> {
    let rows = blocking(&state, |db| Ok(db.list_goods()?)).await?;
    Ok(Json(rows.into_iter().map(Goods::from).collect()))
}

/// POST /store/{id}/buy
pub async fn buy(
    State(state): State<AppState>,
    ItemId(goods_id): ItemId,
    Extension(user): Extension<CurrentUser>,
) -> Result<Redirect, AppError> {
    let buyer = user.username.clone();
    blocking(&state, move |db| Ok(db.purchase_goods(&buyer, goods_id)?))
        .await
        .inspect_err(|e| warn!("{} could not buy goods {}: {}", user.username, goods_id, e))?;

    Ok(Redirect::to("/store"))
}
