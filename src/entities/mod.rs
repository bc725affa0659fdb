/// Storefront entities
pub mod banner;
pub mod blog_post;
pub mod brand;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod order;
pub mod order_item;
pub mod order_timeline;
pub mod product;
pub mod product_image;
pub mod product_variant;
pub mod review;

// Re-export entities
pub use banner::{Entity as Banner, Model as BannerModel};
pub use blog_post::{Entity as BlogPost, Model as BlogPostModel};
pub use brand::{Entity as Brand, Model as BrandModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use coupon::{DiscountType, Entity as Coupon, Model as CouponModel};
pub use order::{
    Entity as Order, FulfillmentStatus, Model as OrderModel, PaymentMethod, PaymentStatus,
};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use order_timeline::{Entity as OrderTimeline, Model as OrderTimelineModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use review::{Entity as Review, Model as ReviewModel};
