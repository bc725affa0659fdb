mod common;

use common::*;
use threadline_api::errors::ServiceError;
use threadline_api::services::content::{BannerInput, CreatePostInput, UpdatePostInput};

#[tokio::test]
async fn banners_order_by_position_and_hide_inactive() {
    let app = setup().await;

    let second = app
        .content
        .create_banner(BannerInput {
            title: "Monsoon Sale".into(),
            image_url: "https://cdn.example.com/monsoon.jpg".into(),
            link_url: Some("/sale".into()),
            position: 2,
            is_active: true,
        })
        .await
        .unwrap();
    app.content
        .create_banner(BannerInput {
            title: "New Arrivals".into(),
            image_url: "https://cdn.example.com/new.jpg".into(),
            link_url: None,
            position: 1,
            is_active: true,
        })
        .await
        .unwrap();
    app.content
        .create_banner(BannerInput {
            title: "Draft".into(),
            image_url: "https://cdn.example.com/draft.jpg".into(),
            link_url: None,
            position: 0,
            is_active: false,
        })
        .await
        .unwrap();

    let banners = app.content.active_banners().await.unwrap();
    assert_eq!(banners.len(), 2);
    assert_eq!(banners[0].title, "New Arrivals");
    assert_eq!(banners[1].title, "Monsoon Sale");

    app.content.delete_banner(second.id).await.unwrap();
    assert_eq!(app.content.active_banners().await.unwrap().len(), 1);
}

#[tokio::test]
async fn blog_publishing_lifecycle() {
    let app = setup().await;

    let draft = app
        .content
        .create_post(CreatePostInput {
            title: "Styling linen".into(),
            slug: "styling-linen".into(),
            excerpt: "Three ways to wear linen this summer".into(),
            body: "Linen breathes...".into(),
            cover_image_url: None,
            publish: false,
        })
        .await
        .unwrap();
    assert!(draft.published_at.is_none());

    // Drafts are invisible publicly
    let err = app.content.get_post_by_slug("styling-linen").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let (posts, total) = app.content.list_posts(1, 10).await.unwrap();
    assert_eq!(total, 0);
    assert!(posts.is_empty());

    let published = app
        .content
        .update_post(
            draft.id,
            UpdatePostInput {
                publish: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(published.published_at.is_some());

    let fetched = app.content.get_post_by_slug("styling-linen").await.unwrap();
    assert_eq!(fetched.id, draft.id);

    // Slug uniqueness
    let err = app
        .content
        .create_post(CreatePostInput {
            title: "Another".into(),
            slug: "styling-linen".into(),
            excerpt: "dup".into(),
            body: "dup".into(),
            cover_image_url: None,
            publish: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}
