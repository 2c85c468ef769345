use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                username        TEXT PRIMARY KEY,
                password_hash   TEXT NOT NULL,
                email           TEXT NOT NULL,
                balance         INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL REFERENCES users(username)
                                ON UPDATE CASCADE ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at  TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_expiry ON sessions(expires_at);

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                content     TEXT,
                author      TEXT NOT NULL REFERENCES users(username) ON UPDATE CASCADE
            );

            CREATE TABLE goods (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                price       INTEGER NOT NULL CHECK (price >= 0),
                description TEXT
            );

            CREATE TABLE sales_goods (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                price       INTEGER NOT NULL CHECK (price >= 0),
                author      TEXT NOT NULL REFERENCES users(username) ON UPDATE CASCADE,
                description TEXT,
                visible     INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX idx_sales_goods_author ON sales_goods(author);

            CREATE TABLE buy_history (
                username        TEXT NOT NULL REFERENCES users(username) ON UPDATE CASCADE,
                goods_id        INTEGER REFERENCES goods(id),
                sales_goods_id  INTEGER REFERENCES sales_goods(id),
                price           INTEGER NOT NULL,
                timestamp       TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK ((goods_id IS NULL) <> (sales_goods_id IS NULL))
            );

            CREATE INDEX idx_buy_history_user ON buy_history(username, timestamp);

            -- Store catalogue
            INSERT INTO goods (name, price, description) VALUES
                ('Access badge', 500, 'Grants entry to the reading room'),
                ('Archive pass', 1000, 'One week of archive access'),
                ('Coffee voucher', 150, 'Redeemable at the lobby kiosk'),
                ('Notebook', 300, 'A5 ruled notebook');

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
