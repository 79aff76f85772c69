//! Order Repository
//!
//! Read side only: order mutations (create/update/cancel) always go through
//! the settlement engine so stock side effects commit atomically with the
//! order document.

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoResult, parse_record_id};
use crate::db::models::Order;

const TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let rid = parse_record_id(TABLE, id)?;
        let order: Option<Order> = self.base.db().select(rid).await?;
        Ok(order)
    }

    /// List orders, newest first, optionally filtered by shop and/or user
    pub async fn find_all(
        &self,
        shop: Option<String>,
        user_id: Option<String>,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<Order>> {
        let mut conditions: Vec<&str> = Vec::new();
        if shop.is_some() {
            conditions.push("shop = $shop");
        }
        if user_id.is_some() {
            conditions.push("user_id = $user_id");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };
        let query_str = format!(
            "SELECT * FROM order {}ORDER BY created_at DESC LIMIT $limit START $offset",
            where_clause
        );

        let mut query = self
            .base
            .db()
            .query(query_str)
            .bind(("limit", limit))
            .bind(("offset", offset));
        if let Some(shop) = shop {
            query = query.bind(("shop", shop));
        }
        if let Some(user_id) = user_id {
            query = query.bind(("user_id", user_id));
        }

        let orders: Vec<Order> = query.await?.take(0)?;
        Ok(orders)
    }
}
