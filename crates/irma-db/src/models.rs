//! Database row types. These map directly to SQLite rows and stay distinct
//! from the irma-types models so the password hash never leaves this crate
//! by accident.

use chrono::{DateTime, NaiveDateTime, Utc};
use irma_types::models::{Goods, Listing, Post, Profile, Purchase};
use tracing::warn;

pub struct UserRow {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub balance: i64,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub author: String,
}

pub struct GoodsRow {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
}

pub struct ListingRow {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub author: String,
    pub description: Option<String>,
    pub visible: bool,
}

pub struct PurchaseRow {
    pub username: String,
    pub goods_id: Option<i64>,
    pub sales_goods_id: Option<i64>,
    pub item_name: Option<String>,
    pub price: i64,
    pub timestamp: String,
}

impl From<UserRow> for Profile {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            email: row.email,
            balance: row.balance,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            author: row.author,
        }
    }
}

impl From<GoodsRow> for Goods {
    fn from(row: GoodsRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            description: row.description,
        }
    }
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            author: row.author,
            description: row.description,
            visible: row.visible,
        }
    }
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        let timestamp = parse_sqlite_timestamp(&row.timestamp).unwrap_or_else(|| {
            warn!("Corrupt timestamp '{}' in history of '{}'", row.timestamp, row.username);
            DateTime::default()
        });

        Self {
            username: row.username,
            goods_id: row.goods_id,
            sales_goods_id: row.sales_goods_id,
            item_name: row.item_name,
            price: row.price,
            timestamp,
        }
    }
}

/// SQLite's `datetime('now')` yields "YYYY-MM-DD HH:MM:SS" without a zone;
/// it is always UTC.
fn parse_sqlite_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let ts = parse_sqlite_timestamp("2024-03-05 07:08:09").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (7, 8, 9));

        assert!(parse_sqlite_timestamp("2024-03-05T07:08:09Z").is_some());
        assert!(parse_sqlite_timestamp("yesterday").is_none());
    }
}
