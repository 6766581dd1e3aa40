//! Spending points in the store

use tracing::{info, warn};

use crate::db::{notification_repo, store_repo, user_repo, Database};
use crate::utils::{AppError, AppResult};

/// Result of a successful purchase
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub inventory_id: i64,
    pub item_id: i64,
    pub category: String,
    pub price: i64,
    pub remaining_balance: i64,
}

pub struct PurchaseService<'a> {
    db: &'a Database,
}

impl<'a> PurchaseService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Buy `item_id` for `user_id`.
    ///
    /// `expected_price` is the price the buyer was shown; a catalog change in
    /// between fails the purchase instead of charging a different amount. The
    /// debit only succeeds while the balance still covers the price, so
    /// concurrent purchases can never overdraw an account.
    pub fn purchase(&self, user_id: i64, item_id: i64, expected_price: i64) -> AppResult<Purchase> {
        if expected_price < 0 {
            return Err(AppError::validation("price must not be negative"));
        }

        let result = self.db.transaction(|tx| {
            let user = user_repo::find_by_id(tx, user_id)?
                .ok_or_else(|| AppError::validation(format!("unknown user {}", user_id)))?;
            let item = store_repo::find_item(tx, item_id)?
                .ok_or_else(|| AppError::validation(format!("unknown item {}", item_id)))?;

            if item.price != expected_price {
                return Err(AppError::validation(format!(
                    "price of {} changed from {} to {}",
                    item.name, expected_price, item.price
                )));
            }

            if !user_repo::debit_points(tx, user_id, item.price)? {
                return Err(AppError::InsufficientFunds {
                    balance: user.points,
                    price: item.price,
                });
            }

            let inventory_id = store_repo::insert_inventory(tx, user_id, item_id, &item.category)?;
            notification_repo::append(
                tx,
                user_id,
                &format!("bought {} for {} points", item.name, item.price),
            )?;

            Ok(Purchase {
                inventory_id,
                item_id,
                category: item.category,
                price: item.price,
                remaining_balance: user.points - item.price,
            })
        });

        match &result {
            Ok(purchase) => info!(
                user_id,
                item_id,
                price = purchase.price,
                remaining = purchase.remaining_balance,
                "item purchased"
            ),
            Err(AppError::InsufficientFunds { balance, price }) => {
                warn!(user_id, item_id, balance, price, "purchase refused, not enough points")
            }
            Err(_) => {}
        }

        result
    }
}
