use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{
    cart_item, product_image, CartItem, CartItemModel, Product, ProductImage, ProductVariant,
};
use crate::errors::ServiceError;

/// Per-variant line cap; one shopper cannot sweep a whole size run.
pub const MAX_QUANTITY_PER_LINE: i32 = 10;

/// Cart line joined with live catalog data. Prices here are always current;
/// they only freeze at order placement.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub size: String,
    pub color: String,
    pub sku: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
    pub in_stock: bool,
    pub available_stock: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub subtotal: i64,
    pub item_count: i32,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Current cart with live prices and stock flags.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let lines = self.load_lines(self.db.as_ref(), user_id).await?;
        let subtotal = lines.iter().map(|l| l.line_total).sum();
        let item_count = lines.iter().map(|l| l.quantity).sum();
        Ok(CartView {
            items: lines,
            subtotal,
            item_count,
        })
    }

    /// Join cart rows against the live catalog. Shared with checkout, which
    /// runs it inside the order transaction.
    pub async fn load_lines<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<Vec<CartLine>, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(conn)
            .await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let variant = ProductVariant::find_by_id(item.variant_id)
                .one(conn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Variant {}", item.variant_id)))?;
            let product = Product::find_by_id(item.product_id)
                .one(conn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Product {}", item.product_id)))?;
            let image = ProductImage::find()
                .filter(product_image::Column::ProductId.eq(product.id))
                .order_by_desc(product_image::Column::IsPrimary)
                .order_by_asc(product_image::Column::Position)
                .one(conn)
                .await?;

            let unit_price = variant.unit_price(product.base_price);
            lines.push(CartLine {
                item_id: item.id,
                product_id: product.id,
                variant_id: variant.id,
                product_name: product.name.clone(),
                product_slug: product.slug.clone(),
                size: variant.size.clone(),
                color: variant.color.clone(),
                sku: variant.sku.clone(),
                unit_price,
                quantity: item.quantity,
                line_total: unit_price * item.quantity as i64,
                in_stock: variant.stock >= item.quantity,
                available_stock: variant.stock,
                image_url: image.map(|i| i.url),
            });
        }
        Ok(lines)
    }

    /// Add a variant to the cart, merging with an existing line for the
    /// same variant. The stock check here is advisory; the binding check
    /// happens at placement.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".into(),
            ));
        }

        let variant = ProductVariant::find_by_id(variant_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {}", variant_id)))?;
        let product = Product::find_by_id(variant.product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {}", variant.product_id)))?;
        if !product.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "{} is no longer available",
                product.name
            )));
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::VariantId.eq(variant_id))
            .one(self.db.as_ref())
            .await?;

        let new_quantity = existing.as_ref().map_or(0, |i| i.quantity) + quantity;
        if new_quantity > MAX_QUANTITY_PER_LINE {
            return Err(ServiceError::ValidationError(format!(
                "at most {} units of one variant per order",
                MAX_QUANTITY_PER_LINE
            )));
        }
        if variant.stock < new_quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "{} ({} / {})",
                product.name, variant.size, variant.color
            )));
        }

        let now = Utc::now();
        match existing {
            Some(item) => {
                let mut model: cart_item::ActiveModel = item.into();
                model.quantity = Set(new_quantity);
                model.updated_at = Set(now);
                model.update(self.db.as_ref()).await?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product.id),
                    variant_id: Set(variant_id),
                    quantity: Set(quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(self.db.as_ref())
                .await?;
            }
        }

        self.get_cart(user_id).await
    }

    /// Set a line's quantity; zero removes the line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity < 0 || quantity > MAX_QUANTITY_PER_LINE {
            return Err(ServiceError::ValidationError(format!(
                "quantity must be between 0 and {}",
                MAX_QUANTITY_PER_LINE
            )));
        }

        let item = self.owned_item(user_id, item_id).await?;

        if quantity == 0 {
            item.delete(self.db.as_ref()).await?;
            return self.get_cart(user_id).await;
        }

        let variant = ProductVariant::find_by_id(item.variant_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {}", item.variant_id)))?;
        if variant.stock < quantity {
            return Err(ServiceError::InsufficientStock(variant.sku));
        }

        let mut model: cart_item::ActiveModel = item.into();
        model.quantity = Set(quantity);
        model.updated_at = Set(Utc::now());
        model.update(self.db.as_ref()).await?;

        self.get_cart(user_id).await
    }

    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, ServiceError> {
        let item = self.owned_item(user_id, item_id).await?;
        item.delete(self.db.as_ref()).await?;
        self.get_cart(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.clear_on(self.db.as_ref(), user_id).await
    }

    /// Empty the cart inside the caller's transaction (checkout commit).
    pub async fn clear_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn owned_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<CartItemModel, ServiceError> {
        CartItem::find_by_id(item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {}", item_id)))
    }
}
