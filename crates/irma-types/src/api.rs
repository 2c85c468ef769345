use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Listing;

// -- Session --

/// Claims carried by the signed session cookie. The username lives in the
/// server-side session row named by `sid`, so a rename never invalidates
/// the cookie and a logout always does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sid: Uuid,
    pub exp: usize,
}

// -- Auth --

// Form fields are optional so handlers can answer a missing field with a
// validation error instead of the extractor's generic rejection.

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

// -- Board --

#[derive(Debug, Deserialize)]
pub struct NewPostForm {
    pub title: Option<String>,
    pub content: Option<String>,
}

// -- Market --

#[derive(Debug, Deserialize)]
pub struct NewListingForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditListingForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub visible: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DonateForm {
    pub amount: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarketResponse {
    /// Every listing the caller authored, hidden ones included.
    pub own: Vec<Listing>,
    /// Visible listings by other users.
    pub available: Vec<Listing>,
}

// -- Profile --

#[derive(Debug, Deserialize)]
pub struct EditProfileForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub edit_username: Option<String>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
