//! Balance movement. Every operation here runs in one IMMEDIATE
//! transaction on the writer: the payer is debited with a guarded UPDATE
//! that only matches when the balance covers the amount, then the payee is
//! credited and history recorded. Any failure drops the transaction, which
//! rolls it back.

use rusqlite::{OptionalExtension, Transaction, params};
use thiserror::Error;
use tracing::info;

use crate::Database;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("item not found")]
    NotFound,

    #[error("cannot trade with yourself")]
    SelfDealing,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("insufficient balance")]
    InsufficientFunds,

    #[error("payee '{0}' does not exist")]
    PayeeMissing(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub amount: i64,
    /// Payer's balance after the debit.
    pub balance: i64,
}

impl Database {
    /// Buys a store item at its current price.
    pub fn purchase_goods(&self, username: &str, goods_id: i64) -> Result<Receipt, TransferError> {
        let receipt = self.with_tx(|tx| -> Result<Receipt, TransferError> {
            let price: i64 = tx
                .query_row("SELECT price FROM goods WHERE id = ?1", [goods_id], |row| row.get(0))
                .optional()?
                .ok_or(TransferError::NotFound)?;

            let balance = transfer(tx, username, None, price)?;
            tx.execute(
                "INSERT INTO buy_history (username, goods_id, price) VALUES (?1, ?2, ?3)",
                params![username, goods_id, price],
            )?;

            Ok(Receipt { amount: price, balance })
        })?;

        info!("{} bought goods {} for {}", username, goods_id, receipt.amount);
        Ok(receipt)
    }

    /// Buys another user's visible listing; the price moves from buyer to
    /// author.
    pub fn purchase_listing(&self, buyer: &str, listing_id: i64) -> Result<Receipt, TransferError> {
        let receipt = self.with_tx(|tx| -> Result<Receipt, TransferError> {
            let (price, author, visible): (i64, String, bool) = tx
                .query_row(
                    "SELECT price, author, visible FROM sales_goods WHERE id = ?1",
                    [listing_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?
                .ok_or(TransferError::NotFound)?;

            if !visible {
                return Err(TransferError::NotFound);
            }
            if author == buyer {
                return Err(TransferError::SelfDealing);
            }

            let balance = transfer(tx, buyer, Some(&author), price)?;
            tx.execute(
                "INSERT INTO buy_history (username, sales_goods_id, price) VALUES (?1, ?2, ?3)",
                params![buyer, listing_id, price],
            )?;

            Ok(Receipt { amount: price, balance })
        })?;

        info!("{} bought listing {} for {}", buyer, listing_id, receipt.amount);
        Ok(receipt)
    }

    /// Gives `amount` to the author of a listing. Leaves no history row.
    pub fn donate(&self, donor: &str, listing_id: i64, amount: i64) -> Result<Receipt, TransferError> {
        if amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }

        let receipt = self.with_tx(|tx| -> Result<Receipt, TransferError> {
            let author: String = tx
                .query_row("SELECT author FROM sales_goods WHERE id = ?1", [listing_id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or(TransferError::NotFound)?;

            if author == donor {
                return Err(TransferError::SelfDealing);
            }

            let balance = transfer(tx, donor, Some(&author), amount)?;
            Ok(Receipt { amount, balance })
        })?;

        info!("{} donated {} via listing {}", donor, amount, listing_id);
        Ok(receipt)
    }
}

/// Debits `payer` and credits `payee` (if any) inside `tx`. Returns the
/// payer's remaining balance.
fn transfer(
    tx: &Transaction<'_>,
    payer: &str,
    payee: Option<&str>,
    amount: i64,
) -> Result<i64, TransferError> {
    if amount < 0 {
        return Err(TransferError::InvalidAmount);
    }

    let balance: i64 = tx
        .query_row(
            "UPDATE users SET balance = balance - ?1
             WHERE username = ?2 AND balance >= ?1
             RETURNING balance",
            params![amount, payer],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(TransferError::InsufficientFunds)?;

    if let Some(payee) = payee {
        let credited = tx.execute(
            "UPDATE users SET balance = balance + ?1 WHERE username = ?2",
            params![amount, payee],
        )?;
        if credited == 0 {
            return Err(TransferError::PayeeMissing(payee.to_string()));
        }
    }

    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn setup(users: &[(&str, i64)]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for (name, balance) in users {
            db.create_user(name, "hash", "user@irma.test", *balance).unwrap();
        }
        db
    }

    fn balance(db: &Database, username: &str) -> i64 {
        db.get_user(username).unwrap().unwrap().balance
    }

    #[test]
    fn purchase_debits_and_records_history() {
        let db = setup(&[("alice", 1000)]);
        let goods = db.insert_goods("pen", 120, None).unwrap();

        let receipt = db.purchase_goods("alice", goods).unwrap();
        assert_eq!(receipt, Receipt { amount: 120, balance: 880 });
        assert_eq!(balance(&db, "alice"), 880);

        let history = db.list_history("alice").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].goods_id, Some(goods));
        assert_eq!(history[0].price, 120);
    }

    #[test]
    fn purchase_never_overdraws() {
        let db = setup(&[("alice", 99)]);
        let goods = db.insert_goods("pen", 100, None).unwrap();

        assert!(matches!(
            db.purchase_goods("alice", goods),
            Err(TransferError::InsufficientFunds)
        ));
        assert_eq!(balance(&db, "alice"), 99);
        assert!(db.list_history("alice").unwrap().is_empty());
    }

    #[test]
    fn purchase_of_unknown_goods_is_not_found() {
        let db = setup(&[("alice", 99)]);
        assert!(matches!(db.purchase_goods("alice", 9999), Err(TransferError::NotFound)));
    }

    #[test]
    fn zero_priced_goods_can_be_bought_with_empty_balance() {
        let db = setup(&[("alice", 0)]);
        let goods = db.insert_goods("flyer", 0, None).unwrap();
        assert_eq!(db.purchase_goods("alice", goods).unwrap().balance, 0);
    }

    #[test]
    fn listing_purchase_moves_money_to_author() {
        let db = setup(&[("alice", 300), ("bob", 5)]);
        let listing = db.insert_listing("bob", "lamp", 200, None).unwrap();

        db.purchase_listing("alice", listing).unwrap();
        assert_eq!(balance(&db, "alice"), 100);
        assert_eq!(balance(&db, "bob"), 205);
        assert_eq!(db.list_history("alice").unwrap()[0].sales_goods_id, Some(listing));
    }

    #[test]
    fn listing_purchase_rejects_own_and_hidden_listings() {
        let db = setup(&[("alice", 300), ("bob", 0)]);
        let own = db.insert_listing("alice", "mug", 10, None).unwrap();
        let hidden = db.insert_listing("bob", "lamp", 10, None).unwrap();
        db.update_listing(hidden, "lamp", 10, "", false).unwrap();

        assert!(matches!(db.purchase_listing("alice", own), Err(TransferError::SelfDealing)));
        assert!(matches!(db.purchase_listing("alice", hidden), Err(TransferError::NotFound)));
        assert_eq!(balance(&db, "alice"), 300);
    }

    #[test]
    fn donation_moves_money_without_history() {
        let db = setup(&[("alice", 50), ("bob", 0)]);
        let listing = db.insert_listing("bob", "lamp", 999, None).unwrap();

        let receipt = db.donate("alice", listing, 30).unwrap();
        assert_eq!(receipt.balance, 20);
        assert_eq!(balance(&db, "bob"), 30);
        assert!(db.list_history("alice").unwrap().is_empty());
    }

    #[test]
    fn non_positive_donation_changes_nothing() {
        let db = setup(&[("alice", 50), ("bob", 0)]);
        let listing = db.insert_listing("bob", "lamp", 1, None).unwrap();

        for amount in [0, -10] {
            assert!(matches!(
                db.donate("alice", listing, amount),
                Err(TransferError::InvalidAmount)
            ));
        }
        assert_eq!(balance(&db, "alice"), 50);
        assert_eq!(balance(&db, "bob"), 0);
    }

    #[test]
    fn failed_credit_rolls_back_debit() {
        let db = setup(&[("alice", 50)]);
        let result = db.with_tx(|tx| transfer(tx, "alice", Some("ghost"), 20));

        assert!(matches!(result, Err(TransferError::PayeeMissing(name)) if name == "ghost"));
        assert_eq!(balance(&db, "alice"), 50);
    }

    #[test]
    fn concurrent_buys_only_one_succeeds() {
        let db = Arc::new(setup(&[("alice", 100)]));
        let goods = db.insert_goods("ticket", 100, None).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let db = db.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    db.purchase_goods("alice", goods)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(TransferError::InsufficientFunds)))
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(refused, 1);
        assert_eq!(balance(&db, "alice"), 0);
        assert_eq!(db.list_history("alice").unwrap().len(), 1);
    }
}
