use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    brand, category, product, product_image, product_variant, Brand, BrandModel, Category,
    CategoryModel, Product, ProductImage, ProductImageModel, ProductModel, ProductVariant,
    ProductVariantModel,
};
use crate::errors::ServiceError;

/// Catalog browsing and admin product management.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Popular,
    Rating,
}

/// Query parameters for product listing. All filters are optional and
/// combine with AND semantics.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProductFilters {
    pub gender: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub q: Option<String>,
    pub featured: Option<bool>,
    pub new_arrivals: Option<bool>,
    pub bestsellers: Option<bool>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Listing card: the product plus its primary image.
#[derive(Debug, Clone, Serialize)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: ProductModel,
    pub image_url: Option<String>,
}

/// Full product page payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductModel,
    pub variants: Vec<ProductVariantModel>,
    pub images: Vec<ProductImageModel>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VariantInput {
    #[validate(length(min = 1, max = 16))]
    pub size: String,
    #[validate(length(min = 1, max = 32))]
    pub color: String,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default)]
    pub price_delta: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImageInput {
    #[validate(url)]
    pub url: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    pub description: String,
    #[validate(custom = "validate_gender")]
    pub gender: String,
    #[validate(range(min = 1))]
    pub base_price: i64,
    pub compare_at_price: Option<i64>,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new_arrival: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    #[validate]
    #[serde(default)]
    pub variants: Vec<VariantInput>,
    #[validate]
    #[serde(default)]
    pub images: Vec<ImageInput>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub base_price: Option<i64>,
    pub compare_at_price: Option<Option<i64>>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_new_arrival: Option<bool>,
    pub is_bestseller: Option<bool>,
}

fn validate_gender(gender: &str) -> Result<(), validator::ValidationError> {
    match gender {
        "men" | "women" | "unisex" => Ok(()),
        _ => Err(validator::ValidationError::new(
            "gender must be one of: men, women, unisex",
        )),
    }
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Browse active products with filters, sorting and pagination.
    #[instrument(skip(self, filters))]
    pub async fn list_products(
        &self,
        filters: ProductFilters,
    ) -> Result<(Vec<ProductCard>, u64), ServiceError> {
        let mut condition = Condition::all().add(product::Column::IsActive.eq(true));

        if let Some(gender) = &filters.gender {
            condition = condition.add(product::Column::Gender.eq(gender.as_str()));
        }
        if let Some(slug) = &filters.category {
            let category = Category::find()
                .filter(category::Column::Slug.eq(slug.as_str()))
                .one(self.db.as_ref())
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Category {}", slug)))?;
            condition = condition.add(product::Column::CategoryId.eq(category.id));
        }
        if let Some(slug) = &filters.brand {
            let brand = Brand::find()
                .filter(brand::Column::Slug.eq(slug.as_str()))
                .one(self.db.as_ref())
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Brand {}", slug)))?;
            condition = condition.add(product::Column::BrandId.eq(brand.id));
        }
        if filters.size.is_some() || filters.color.is_some() {
            // Size/color live on variants; match products having at least
            // one variant satisfying both.
            let mut variant_cond = Condition::all();
            if let Some(size) = &filters.size {
                variant_cond = variant_cond.add(product_variant::Column::Size.eq(size.as_str()));
            }
            if let Some(color) = &filters.color {
                variant_cond = variant_cond.add(product_variant::Column::Color.eq(color.as_str()));
            }
            let product_ids: Vec<Uuid> = ProductVariant::find()
                .filter(variant_cond)
                .select_only()
                .column(product_variant::Column::ProductId)
                .distinct()
                .into_tuple()
                .all(self.db.as_ref())
                .await?;
            condition = condition.add(product::Column::Id.is_in(product_ids));
        }
        if let Some(min) = filters.min_price {
            condition = condition.add(product::Column::BasePrice.gte(min));
        }
        if let Some(max) = filters.max_price {
            condition = condition.add(product::Column::BasePrice.lte(max));
        }
        if let Some(q) = &filters.q {
            let needle = format!("%{}%", q.trim());
            condition = condition.add(
                Condition::any()
                    .add(product::Column::Name.like(needle.clone()))
                    .add(product::Column::Description.like(needle)),
            );
        }
        if filters.featured == Some(true) {
            condition = condition.add(product::Column::IsFeatured.eq(true));
        }
        if filters.new_arrivals == Some(true) {
            condition = condition.add(product::Column::IsNewArrival.eq(true));
        }
        if filters.bestsellers == Some(true) {
            condition = condition.add(product::Column::IsBestseller.eq(true));
        }

        let mut query = Product::find().filter(condition);
        query = match filters.sort {
            ProductSort::Newest => query.order_by_desc(product::Column::CreatedAt),
            ProductSort::PriceAsc => query.order_by_asc(product::Column::BasePrice),
            ProductSort::PriceDesc => query.order_by_desc(product::Column::BasePrice),
            ProductSort::Popular => query.order_by_desc(product::Column::SoldCount),
            ProductSort::Rating => query.order_by_desc(product::Column::RatingAvgHundredths),
        };

        let per_page = filters.per_page.unwrap_or(24).clamp(1, 100);
        let page = filters.page.unwrap_or(1).max(1);
        let paginator = query.paginate(self.db.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        let mut cards = Vec::with_capacity(products.len());
        for p in products {
            let image = ProductImage::find()
                .filter(product_image::Column::ProductId.eq(p.id))
                .order_by_desc(product_image::Column::IsPrimary)
                .order_by_asc(product_image::Column::Position)
                .one(self.db.as_ref())
                .await?;
            cards.push(ProductCard {
                product: p,
                image_url: image.map(|i| i.url),
            });
        }
        Ok((cards, total))
    }

    /// Product page by slug. Bumps the view counter without holding up the
    /// response path on contention.
    #[instrument(skip(self))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<ProductDetail, ServiceError> {
        let product = Product::find()
            .filter(product::Column::Slug.eq(slug))
            .filter(product::Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {}", slug)))?;

        if let Err(e) = Product::update_many()
            .col_expr(
                product::Column::ViewCount,
                Expr::col(product::Column::ViewCount).add(1),
            )
            .filter(product::Column::Id.eq(product.id))
            .exec(self.db.as_ref())
            .await
        {
            warn!(product_id = %product.id, "failed to bump view count: {}", e);
        }

        self.load_detail(product).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = Product::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {}", id)))?;
        self.load_detail(product).await
    }

    async fn load_detail(&self, product: ProductModel) -> Result<ProductDetail, ServiceError> {
        let variants = ProductVariant::find()
            .filter(product_variant::Column::ProductId.eq(product.id))
            .order_by_asc(product_variant::Column::Size)
            .all(self.db.as_ref())
            .await?;
        let images = ProductImage::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .order_by_asc(product_image::Column::Position)
            .all(self.db.as_ref())
            .await?;
        Ok(ProductDetail {
            product,
            variants,
            images,
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await?)
    }

    pub async fn list_brands(&self) -> Result<Vec<BrandModel>, ServiceError> {
        Ok(Brand::find()
            .filter(brand::Column::IsActive.eq(true))
            .order_by_asc(brand::Column::Name)
            .all(self.db.as_ref())
            .await?)
    }

    // Admin operations

    /// Create a product along with its variants and images in one
    /// transaction.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        input.validate()?;

        let existing = Product::find()
            .filter(product::Column::Slug.eq(input.slug.as_str()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product slug {} already exists",
                input.slug
            )));
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let product_id = Uuid::new_v4();

        let created = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            gender: Set(input.gender),
            base_price: Set(input.base_price),
            compare_at_price: Set(input.compare_at_price),
            category_id: Set(input.category_id),
            brand_id: Set(input.brand_id),
            is_active: Set(true),
            is_featured: Set(input.is_featured),
            is_new_arrival: Set(input.is_new_arrival),
            is_bestseller: Set(input.is_bestseller),
            view_count: Set(0),
            sold_count: Set(0),
            rating_avg_hundredths: Set(0),
            review_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for v in input.variants {
            product_variant::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                size: Set(v.size),
                color: Set(v.color),
                sku: Set(v.sku),
                stock: Set(v.stock),
                price_delta: Set(v.price_delta),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        for img in input.images {
            product_image::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                url: Set(img.url),
                alt_text: Set(img.alt_text),
                position: Set(img.position),
                is_primary: Set(img.is_primary),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(product_id = %product_id, "product created");
        self.load_detail(created).await
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        let existing = Product::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {}", id)))?;

        if let Some(gender) = &input.gender {
            validate_gender(gender).map_err(|_| {
                ServiceError::ValidationError("gender must be one of: men, women, unisex".into())
            })?;
        }
        if let Some(price) = input.base_price {
            if price < 1 {
                return Err(ServiceError::ValidationError(
                    "base_price must be positive".into(),
                ));
            }
        }

        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(gender) = input.gender {
            model.gender = Set(gender);
        }
        if let Some(price) = input.base_price {
            model.base_price = Set(price);
        }
        if let Some(compare) = input.compare_at_price {
            model.compare_at_price = Set(compare);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(category_id);
        }
        if let Some(brand_id) = input.brand_id {
            model.brand_id = Set(brand_id);
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }
        if let Some(flag) = input.is_featured {
            model.is_featured = Set(flag);
        }
        if let Some(flag) = input.is_new_arrival {
            model.is_new_arrival = Set(flag);
        }
        if let Some(flag) = input.is_bestseller {
            model.is_bestseller = Set(flag);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(self.db.as_ref()).await?;
        self.load_detail(updated).await
    }

    /// Soft delete: orders hold frozen snapshots, so products are
    /// deactivated rather than removed.
    pub async fn deactivate_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::update_many()
            .col_expr(product::Column::IsActive, Expr::value(false))
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {}", id)));
        }
        Ok(())
    }

    pub async fn add_variant(
        &self,
        product_id: Uuid,
        input: VariantInput,
    ) -> Result<ProductVariantModel, ServiceError> {
        input.validate()?;
        Product::find_by_id(product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {}", product_id)))?;

        let existing = ProductVariant::find()
            .filter(product_variant::Column::Sku.eq(input.sku.as_str()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} already exists",
                input.sku
            )));
        }

        let now = Utc::now();
        Ok(product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            size: Set(input.size),
            color: Set(input.color),
            sku: Set(input.sku),
            stock: Set(input.stock),
            price_delta: Set(input.price_delta),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?)
    }

    /// Replace a variant's stock level (absolute set, not delta).
    pub async fn set_variant_stock(
        &self,
        variant_id: Uuid,
        stock: i32,
    ) -> Result<ProductVariantModel, ServiceError> {
        if stock < 0 {
            return Err(ServiceError::ValidationError(
                "stock cannot be negative".into(),
            ));
        }
        let variant = ProductVariant::find_by_id(variant_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {}", variant_id)))?;
        let mut model: product_variant::ActiveModel = variant.into();
        model.stock = Set(stock);
        model.updated_at = Set(Utc::now());
        Ok(model.update(self.db.as_ref()).await?)
    }

    pub async fn create_category(
        &self,
        name: String,
        slug: String,
        parent_id: Option<Uuid>,
    ) -> Result<CategoryModel, ServiceError> {
        let existing = Category::find()
            .filter(category::Column::Slug.eq(slug.as_str()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category slug {} already exists",
                slug
            )));
        }
        Ok(category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            parent_id: Set(parent_id),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await?)
    }

    pub async fn create_brand(
        &self,
        name: String,
        slug: String,
    ) -> Result<BrandModel, ServiceError> {
        let existing = Brand::find()
            .filter(brand::Column::Slug.eq(slug.as_str()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Brand slug {} already exists",
                slug
            )));
        }
        Ok(brand::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await?)
    }
}
