use axum::{
    Extension, Form, Json,
    extract::State,
    response::{Html, Redirect},
};
use tracing::{info, warn};

use irma_types::api::{DonateForm, EditListingForm, MarketResponse, NewListingForm};
use irma_types::models::Listing;

use crate::auth::AppState;
use crate::blocking;
use crate::error::AppError;
use crate::extract::ItemId;
use crate::middleware::CurrentUser;
use crate::pages;
use crate::validate;

/// GET /market: the caller's own listings plus what others have on sale.
pub async fn list_market(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<MarketResponse>, AppError> {
    let (own, available) = blocking(&state, move |db| {
        let own = db.list_listings_by(&user.username)?;
        let available = db.list_listings_for(&user.username)?;
        Ok((own, available))
    })
    .await?;

    Ok(Json(MarketResponse {
        own: own.into_iter().map(Listing::from).collect(),
        available: available.into_iter().map(Listing::from).collect(),
    }))
}

pub async fn new_listing_page() -> Html<&'static str> {
    Html(pages::NEW_LISTING)
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<NewListingForm>,
) -> Result<Redirect, AppError> {
    let name = validate::required(form.name, "name")?;
    let price = validate::price(&validate::required(form.price, "price")?)?;
    let description = validate::optional(form.description);

    let author = user.username;
    let id = blocking(&state, move |db| {
        Ok(db.insert_listing(&author, &name, price, description.as_deref())?)
    })
    .await?;

    info!("Listing {} created", id);
    Ok(Redirect::to("/market"))
}

/// POST /market/{id}/edit: only the listing's author may change it.
pub async fn edit_listing(
    State(state): State<AppState>,
    ItemId(listing_id): ItemId,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<EditListingForm>,
) -> Result<Redirect, AppError> {
    let listing = blocking(&state, move |db| Ok(db.get_listing(listing_id)?))
        .await?
        .ok_or(AppError::NotFound)?;

    if listing.author != user.username {
        warn!("{} tried to edit listing {} of {}", user.username, listing_id, listing.author);
        return Err(AppError::Permission);
    }

    let name = validate::required(form.name, "name")?;
    let price = validate::price(&validate::required(form.price, "price")?)?;
    let description = validate::required(form.description, "description")?;
    let visible = validate::checkbox(form.visible.as_deref());

    blocking(&state, move |db| {
        Ok(db.update_listing(listing_id, &name, price, &description, visible)?)
    })
    .await?;

    Ok(Redirect::to("/market"))
}

/// POST /market/{id}/buy
pub async fn buy_listing(
    State(state): State<AppState>,
    ItemId(listing_id): ItemId,
    Extension(user): Extension<CurrentUser>,
) -> Result<Redirect, AppError> {
    let buyer = user.username.clone();
    blocking(&state, move |db| Ok(db.purchase_listing(&buyer, listing_id)?))
        .await
        .inspect_err(|e| warn!("{} could not buy listing {}: {}", user.username, listing_id, e))?;

    Ok(Redirect::to("/market"))
}

/// POST /market/{id}/donate: a non-positive amount is silently ignored.
pub async fn donate(
    State(state): State<AppState>,
    ItemId(listing_id): ItemId,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<DonateForm>,
) -> Result<Redirect, AppError> {
    let amount = validate::integer(&validate::required(form.amount, "amount")?, "amount")?;
    if amount <= 0 {
        return Ok(Redirect::to("/market"));
    }

    let donor = user.username.clone();
    blocking(&state, move |db| Ok(db.donate(&donor, listing_id, amount)?))
        .await
        .inspect_err(|e| warn!("{} could not donate to listing {}: {}", user.username, listing_id, e))?;

    Ok(Redirect::to("/market"))
}
