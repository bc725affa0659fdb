use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{banner, blog_post, Banner, BannerModel, BlogPost, BlogPostModel};
use crate::errors::ServiceError;

/// Merchandising content: homepage banners and the blog.
#[derive(Clone)]
pub struct ContentService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BannerInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(url)]
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    #[validate(length(min = 1, max = 500))]
    pub excerpt: String,
    pub body: String,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    pub cover_image_url: Option<Option<String>>,
    pub publish: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl ContentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn active_banners(&self) -> Result<Vec<BannerModel>, ServiceError> {
        Ok(Banner::find()
            .filter(banner::Column::IsActive.eq(true))
            .order_by_asc(banner::Column::Position)
            .all(self.db.as_ref())
            .await?)
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_banner(&self, input: BannerInput) -> Result<BannerModel, ServiceError> {
        input.validate()?;
        Ok(banner::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            image_url: Set(input.image_url),
            link_url: Set(input.link_url),
            position: Set(input.position),
            is_active: Set(input.is_active),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await?)
    }

    pub async fn update_banner(
        &self,
        id: Uuid,
        input: BannerInput,
    ) -> Result<BannerModel, ServiceError> {
        input.validate()?;
        let existing = Banner::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Banner {}", id)))?;
        let mut model: banner::ActiveModel = existing.into();
        model.title = Set(input.title);
        model.image_url = Set(input.image_url);
        model.link_url = Set(input.link_url);
        model.position = Set(input.position);
        model.is_active = Set(input.is_active);
        Ok(model.update(self.db.as_ref()).await?)
    }

    pub async fn delete_banner(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Banner::delete_by_id(id).exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Banner {}", id)));
        }
        Ok(())
    }

    /// Published posts, newest first.
    pub async fn list_posts(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<BlogPostModel>, u64), ServiceError> {
        let paginator = BlogPost::find()
            .filter(blog_post::Column::IsPublished.eq(true))
            .order_by_desc(blog_post::Column::PublishedAt)
            .paginate(self.db.as_ref(), per_page.clamp(1, 50));
        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((posts, total))
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> Result<BlogPostModel, ServiceError> {
        BlogPost::find()
            .filter(blog_post::Column::Slug.eq(slug))
            .filter(blog_post::Column::IsPublished.eq(true))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post {}", slug)))
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_post(&self, input: CreatePostInput) -> Result<BlogPostModel, ServiceError> {
        input.validate()?;
        let existing = BlogPost::find()
            .filter(blog_post::Column::Slug.eq(input.slug.as_str()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Post slug {} already exists",
                input.slug
            )));
        }

        let now = Utc::now();
        Ok(blog_post::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            slug: Set(input.slug),
            excerpt: Set(input.excerpt),
            body: Set(input.body),
            cover_image_url: Set(input.cover_image_url),
            is_published: Set(input.publish),
            published_at: Set(input.publish.then_some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await?)
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        input: UpdatePostInput,
    ) -> Result<BlogPostModel, ServiceError> {
        let existing = BlogPost::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Post {}", id)))?;
        let was_published = existing.is_published;

        let mut model: blog_post::ActiveModel = existing.into();
        if let Some(title) = input.title {
            model.title = Set(title);
        }
        if let Some(excerpt) = input.excerpt {
            model.excerpt = Set(excerpt);
        }
        if let Some(body) = input.body {
            model.body = Set(body);
        }
        if let Some(cover) = input.cover_image_url {
            model.cover_image_url = Set(cover);
        }
        if let Some(publish) = input.publish {
            model.is_published = Set(publish);
            if publish && !was_published {
                model.published_at = Set(Some(Utc::now()));
            }
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(self.db.as_ref()).await?)
    }

    pub async fn delete_post(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = BlogPost::delete_by_id(id).exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Post {}", id)));
        }
        Ok(())
    }
}
