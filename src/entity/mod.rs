pub mod audit_logs;
pub mod brands;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod discount_products;
pub mod discounts;
pub mod favorites;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod product_tags;
pub mod products;
pub mod reviews;
pub mod tags;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use brands::Entity as Brands;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use discount_products::Entity as DiscountProducts;
pub use discounts::Entity as Discounts;
pub use favorites::Entity as Favorites;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use product_tags::Entity as ProductTags;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use tags::Entity as Tags;
pub use users::Entity as Users;
