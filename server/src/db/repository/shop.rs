//! Shop Repository

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Shop, ShopCreate, ShopUpdate};

const TABLE: &str = "shop";

#[derive(Clone)]
pub struct ShopRepository {
    base: BaseRepository,
}

impl ShopRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_all(&self) -> RepoResult<Vec<Shop>> {
        let shops: Vec<Shop> = self
            .base
            .db()
            .query("SELECT * FROM shop WHERE is_active = true ORDER BY name")
            .await?
            .take(0)?;
        Ok(shops)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Shop>> {
        let rid = parse_record_id(TABLE, id)?;
        let shop: Option<Shop> = self.base.db().select(rid).await?;
        Ok(shop)
    }

    pub async fn create(&self, data: ShopCreate) -> RepoResult<Shop> {
        let shop = Shop {
            id: None,
            name: data.name,
            timezone: data.timezone.unwrap_or_else(|| "UTC".to_string()),
            is_active: true,
        };
        let created: Option<Shop> = self.base.db().create(TABLE).content(shop).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create shop".to_string()))
    }

    pub async fn update(&self, id: &str, data: ShopUpdate) -> RepoResult<Shop> {
        let rid = parse_record_id(TABLE, id)?;
        let mut set_parts: Vec<&str> = Vec::new();
        if data.name.is_some() {
            set_parts.push("name = $name");
        }
        if data.timezone.is_some() {
            set_parts.push("timezone = $timezone");
        }
        if data.is_active.is_some() {
            set_parts.push("is_active = $is_active");
        }
        if set_parts.is_empty() {
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Shop {} not found", id)));
        }

        let query_str = format!("UPDATE $rid SET {} RETURN AFTER", set_parts.join(", "));
        let mut query = self.base.db().query(query_str).bind(("rid", rid));
        if let Some(v) = data.name {
            query = query.bind(("name", v));
        }
        if let Some(v) = data.timezone {
            query = query.bind(("timezone", v));
        }
        if let Some(v) = data.is_active {
            query = query.bind(("is_active", v));
        }

        let shops: Vec<Shop> = query.await?.take(0)?;
        shops
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Shop {} not found", id)))
    }

    /// Soft delete (is_active = false)
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let rid = parse_record_id(TABLE, id)?;
        let updated: Vec<Shop> = self
            .base
            .db()
            .query("UPDATE $rid SET is_active = false RETURN AFTER")
            .bind(("rid", rid))
            .await?
            .take(0)?;
        Ok(!updated.is_empty())
    }
}
