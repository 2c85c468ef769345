use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as shown on their own profile page. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub author: String,
}

/// Fixed-price item sold by the store itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goods {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
}

/// A user-authored market listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub author: String,
    pub description: Option<String>,
    pub visible: bool,
}

/// One completed purchase. Exactly one of `goods_id` and `sales_goods_id`
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub username: String,
    pub goods_id: Option<i64>,
    pub sales_goods_id: Option<i64>,
    pub item_name: Option<String>,
    pub price: i64,
    pub timestamp: DateTime<Utc>,
}
