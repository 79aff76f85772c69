//! Product Repository

use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{DealComponent, Product};
use crate::utils::time::now_millis;
use shared::request::{ProductCreateRequest, ProductUpdateRequest};
use shared::types::PlateType;

const TABLE: &str = "product";

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active products
    pub async fn find_all(&self) -> RepoResult<Vec<Product>> {
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product WHERE is_active = true ORDER BY name")
            .await?
            .take(0)?;
        Ok(products)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let rid = parse_record_id(TABLE, id)?;
        let product: Option<Product> = self.base.db().select(rid).await?;
        Ok(product)
    }

    /// Fetch several products at once; missing ids are simply absent from
    /// the result, callers decide whether that is an error.
    pub async fn find_by_ids(&self, ids: &[String]) -> RepoResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rids = ids
            .iter()
            .map(|id| parse_record_id(TABLE, id))
            .collect::<RepoResult<Vec<RecordId>>>()?;
        let products: Vec<Product> = self
            .base
            .db()
            .query("SELECT * FROM product WHERE id IN $ids")
            .bind(("ids", rids))
            .await?
            .take(0)?;
        Ok(products)
    }

    /// Create a new product; bundle components are denormalized with their
    /// current catalog names.
    pub async fn create(&self, data: ProductCreateRequest) -> RepoResult<Product> {
        if data.parent_product_id.is_some() && data.plate_type.is_none() {
            return Err(RepoError::Validation(
                "plate variant requires plate_type".into(),
            ));
        }

        let deal_products = self.resolve_deal_components(&data).await?;

        let product = Product {
            id: None,
            name: data.name,
            price: data.price,
            unit: data.unit,
            category: data.category_id,
            plate_type: data.plate_type,
            parent_product: data.parent_product_id,
            deal_products,
            is_stock_able: data.is_stock_able,
            stock: data.stock,
            is_active: true,
            created_at: now_millis(),
        };

        let created: Option<Product> = self.base.db().create(TABLE).content(product).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    async fn resolve_deal_components(
        &self,
        data: &ProductCreateRequest,
    ) -> RepoResult<Vec<DealComponent>> {
        let mut components = Vec::with_capacity(data.deal_products.len());
        for input in &data.deal_products {
            let component = self
                .find_by_id(&input.product_id)
                .await?
                .ok_or_else(|| {
                    RepoError::Validation(format!(
                        "Deal component product {} not found",
                        input.product_id
                    ))
                })?;
            components.push(DealComponent {
                product: component.key(),
                name: component.name,
                quantity: input.quantity,
            });
        }
        Ok(components)
    }

    pub async fn update(&self, id: &str, data: ProductUpdateRequest) -> RepoResult<Product> {
        let rid = parse_record_id(TABLE, id)?;

        let deal_products = match &data.deal_products {
            Some(inputs) => {
                let mut components = Vec::with_capacity(inputs.len());
                for input in inputs {
                    let component = self.find_by_id(&input.product_id).await?.ok_or_else(|| {
                        RepoError::Validation(format!(
                            "Deal component product {} not found",
                            input.product_id
                        ))
                    })?;
                    components.push(DealComponent {
                        product: component.key(),
                        name: component.name,
                        quantity: input.quantity,
                    });
                }
                Some(components)
            }
            None => None,
        };

        let mut set_parts: Vec<&str> = Vec::new();
        if data.name.is_some() {
            set_parts.push("name = $name");
        }
        if data.price.is_some() {
            set_parts.push("price = $price");
        }
        if data.unit.is_some() {
            set_parts.push("unit = $unit");
        }
        if data.category_id.is_some() {
            set_parts.push("category = $category");
        }
        if data.plate_type.is_some() {
            set_parts.push("plate_type = $plate_type");
        }
        if data.parent_product_id.is_some() {
            set_parts.push("parent_product = $parent_product");
        }
        if deal_products.is_some() {
            set_parts.push("deal_products = $deal_products");
        }
        if data.is_stock_able.is_some() {
            set_parts.push("is_stock_able = $is_stock_able");
        }
        if data.stock.is_some() {
            set_parts.push("stock = $stock");
        }
        if data.is_active.is_some() {
            set_parts.push("is_active = $is_active");
        }

        if set_parts.is_empty() {
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)));
        }

        let query_str = format!("UPDATE $rid SET {} RETURN AFTER", set_parts.join(", "));
        let mut query = self.base.db().query(query_str).bind(("rid", rid));
        if let Some(v) = data.name {
            query = query.bind(("name", v));
        }
        if let Some(v) = data.price {
            query = query.bind(("price", v));
        }
        if let Some(v) = data.unit {
            query = query.bind(("unit", v));
        }
        if let Some(v) = data.category_id {
            query = query.bind(("category", v));
        }
        if let Some(v) = data.plate_type {
            let tag = match v {
                PlateType::Full => "full",
                PlateType::Half => "half",
            };
            query = query.bind(("plate_type", tag));
        }
        if let Some(v) = data.parent_product_id {
            query = query.bind(("parent_product", v));
        }
        if let Some(v) = deal_products {
            query = query.bind((
                "deal_products",
                serde_json::to_value(&v).unwrap_or_default(),
            ));
        }
        if let Some(v) = data.is_stock_able {
            query = query.bind(("is_stock_able", v));
        }
        if let Some(v) = data.stock {
            query = query.bind(("stock", v));
        }
        if let Some(v) = data.is_active {
            query = query.bind(("is_active", v));
        }

        let products: Vec<Product> = query.await?.take(0)?;
        products
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    /// Soft delete (is_active = false)
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let rid = parse_record_id(TABLE, id)?;
        let updated: Vec<Product> = self
            .base
            .db()
            .query("UPDATE $rid SET is_active = false RETURN AFTER")
            .bind(("rid", rid))
            .await?
            .take(0)?;
        Ok(!updated.is_empty())
    }
}
