use crate::Database;
use crate::models::{GoodsRow, ListingRow, PostRow, PurchaseRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

impl Database {
    // -- Users --

    /// Inserts a new user. Returns `false` when the username is already taken.
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
        balance: i64,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, password_hash, email, balance) VALUES (?1, ?2, ?3, ?4)",
                params![username, password_hash, email, balance],
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(e) if is_key_conflict(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    /// Renames and/or re-addresses a user. Sessions, posts, listings and
    /// history follow the rename through `ON UPDATE CASCADE`. Returns
    /// `false` when `new_username` belongs to someone else.
    pub fn update_profile(&self, username: &str, new_username: &str, email: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE users SET username = ?1, email = ?2 WHERE username = ?3",
                params![new_username, email, username],
            );
            match updated {
                Ok(0) => Err(anyhow::anyhow!("User not found: {}", username)),
                Ok(_) => Ok(true),
                Err(e) if is_key_conflict(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, username: &str, ttl_hours: u64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, username, expires_at)
                 VALUES (?1, ?2, datetime('now', '+' || ?3 || ' hours'))",
                params![id, username, ttl_hours as i64],
            )?;
            Ok(())
        })
    }

    /// Username bound to a live session, if the session exists and has not
    /// expired.
    pub fn session_user(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let username = conn
                .query_row(
                    "SELECT username FROM sessions WHERE id = ?1 AND expires_at > datetime('now')",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(username)
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let removed =
                conn.execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])?;
            Ok(removed)
        })
    }

    // -- Board --

    pub fn insert_post(&self, title: &str, content: Option<&str>, author: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (title, content, author) VALUES (?1, ?2, ?3)",
                params![title, content, author],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, content, author FROM posts ORDER BY title, id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(PostRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        content: row.get(2)?,
                        author: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Store --

    pub fn insert_goods(&self, name: &str, price: i64, description: Option<&str>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO goods (name, price, description) VALUES (?1, ?2, ?3)",
                params![name, price, description],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_goods(&self) -> Result<Vec<GoodsRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, price, description FROM goods ORDER BY name, id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(GoodsRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        price: row.get(2)?,
                        description: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Market --

    pub fn insert_listing(
        &self,
        author: &str,
        name: &str,
        price: i64,
        description: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sales_goods (name, price, author, description) VALUES (?1, ?2, ?3, ?4)",
                params![name, price, author, description],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_listing(&self, id: i64) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, price, author, description, visible
                     FROM sales_goods WHERE id = ?1",
                    [id],
                    listing_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// All listings authored by `author`, hidden ones included.
    pub fn list_listings_by(&self, author: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, price, author, description, visible
                 FROM sales_goods WHERE author = ?1 ORDER BY name, id",
            )?;
            let rows = stmt
                .query_map([author], listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Visible listings that `viewer` could buy.
    pub fn list_listings_for(&self, viewer: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, price, author, description, visible
                 FROM sales_goods WHERE visible = 1 AND author <> ?1 ORDER BY name, id",
            )?;
            let rows = stmt
                .query_map([viewer], listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_listing(
        &self,
        id: i64,
        name: &str,
        price: i64,
        description: &str,
        visible: bool,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE sales_goods SET name = ?1, price = ?2, description = ?3, visible = ?4
                 WHERE id = ?5",
                params![name, price, description, visible, id],
            )?;
            Ok(updated > 0)
        })
    }

    // -- History --

    /// Purchases of `username`, newest first.
    pub fn list_history(&self, username: &str) -> Result<Vec<PurchaseRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT h.username, h.goods_id, h.sales_goods_id, COALESCE(g.name, s.name),
                        h.price, h.timestamp
                 FROM buy_history h
                 LEFT JOIN goods g ON h.goods_id = g.id
                 LEFT JOIN sales_goods s ON h.sales_goods_id = s.id
                 WHERE h.username = ?1
                 ORDER BY h.timestamp DESC, h.rowid DESC",
            )?;
            let rows = stmt
                .query_map([username], |row| {
                    Ok(PurchaseRow {
                        username: row.get(0)?,
                        goods_id: row.get(1)?,
                        sales_goods_id: row.get(2)?,
                        item_name: row.get(3)?,
                        price: row.get(4)?,
                        timestamp: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT username, password_hash, email, balance FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                username: row.get(0)?,
                password_hash: row.get(1)?,
                email: row.get(2)?,
                balance: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

pub(crate) fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        author: row.get(3)?,
        description: row.get(4)?,
        visible: row.get(5)?,
    })
}

/// Primary-key or UNIQUE violation, as opposed to CHECK or foreign-key
/// failures which share the same primary result code.
fn is_key_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irma_types::models::Purchase;

    fn db_with_users(users: &[(&str, i64)]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for (name, balance) in users {
            assert!(db.create_user(name, "hash", &format!("{name}@irma.test"), *balance).unwrap());
        }
        db
    }

    #[test]
    fn duplicate_username_is_reported_not_raised() {
        let db = db_with_users(&[("alice", 0)]);
        assert!(!db.create_user("alice", "other", "x@irma.test", 0).unwrap());
        assert_eq!(db.get_user("alice").unwrap().unwrap().password_hash, "hash");
    }

    #[test]
    fn posts_are_listed_by_title() {
        let db = db_with_users(&[("admin", 0)]);
        db.insert_post("zebra", Some("z"), "admin").unwrap();
        db.insert_post("apple", None, "admin").unwrap();
        db.insert_post("mango", Some("m"), "admin").unwrap();

        let titles: Vec<String> = db.list_posts().unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn seeded_goods_are_sorted_by_name() {
        let db = Database::open_in_memory().unwrap();
        let names: Vec<String> = db.list_goods().unwrap().into_iter().map(|g| g.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert!(!names.is_empty());
        assert_eq!(names, sorted);
    }

    #[test]
    fn market_views_split_own_and_available() {
        let db = db_with_users(&[("alice", 0), ("bob", 0)]);
        let hidden = db.insert_listing("bob", "lamp", 10, None).unwrap();
        db.update_listing(hidden, "lamp", 10, "old lamp", false).unwrap();
        db.insert_listing("bob", "chair", 20, Some("oak")).unwrap();
        db.insert_listing("alice", "desk", 30, None).unwrap();

        let own: Vec<String> = db.list_listings_by("bob").unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(own, vec!["chair", "lamp"]);

        let available: Vec<String> =
            db.list_listings_for("alice").unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(available, vec!["chair"]);
    }

    #[test]
    fn rename_cascades_to_owned_rows() {
        let db = db_with_users(&[("alice", 500)]);
        db.create_session("s1", "alice", 24).unwrap();
        let listing = db.insert_listing("alice", "lamp", 10, None).unwrap();
        db.insert_post("hello", None, "alice").unwrap();
        db.purchase_goods("alice", 1).unwrap();

        assert!(db.update_profile("alice", "alicia", "new@irma.test").unwrap());

        assert!(db.get_user("alice").unwrap().is_none());
        let user = db.get_user("alicia").unwrap().unwrap();
        assert_eq!(user.email, "new@irma.test");
        assert_eq!(db.session_user("s1").unwrap().as_deref(), Some("alicia"));
        assert_eq!(db.get_listing(listing).unwrap().unwrap().author, "alicia");
        assert_eq!(db.list_posts().unwrap()[0].author, "alicia");
        assert_eq!(db.list_history("alicia").unwrap().len(), 1);
    }

    #[test]
    fn rename_onto_existing_user_is_refused() {
        let db = db_with_users(&[("alice", 0), ("bob", 0)]);
        assert!(!db.update_profile("alice", "bob", "a@irma.test").unwrap());
        assert!(db.get_user("alice").unwrap().is_some());
    }

    #[test]
    fn sessions_expire_and_can_be_deleted() {
        let db = db_with_users(&[("alice", 0)]);
        db.create_session("live", "alice", 1).unwrap();
        db.create_session("stale", "alice", 1).unwrap();
        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE sessions SET expires_at = datetime('now', '-1 hours') WHERE id = 'stale'",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.session_user("live").unwrap().as_deref(), Some("alice"));
        assert_eq!(db.session_user("stale").unwrap(), None);
        assert_eq!(db.purge_expired_sessions().unwrap(), 1);

        assert!(db.delete_session("live").unwrap());
        assert!(!db.delete_session("live").unwrap());
        assert_eq!(db.session_user("live").unwrap(), None);
    }

    #[test]
    fn history_is_newest_first_with_item_names() {
        let db = db_with_users(&[("alice", 10_000), ("bob", 0)]);
        let listing = db.insert_listing("bob", "lamp", 40, None).unwrap();
        db.purchase_goods("alice", 1).unwrap();
        db.purchase_listing("alice", listing).unwrap();

        let history: Vec<Purchase> = db
            .list_history("alice")
            .unwrap()
            .into_iter()
            .map(Purchase::from)
            .collect();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sales_goods_id, Some(listing));
        assert_eq!(history[0].goods_id, None);
        assert_eq!(history[0].item_name.as_deref(), Some("lamp"));
        assert_eq!(history[1].goods_id, Some(1));
        assert!(db.list_history("bob").unwrap().is_empty());
    }
}
