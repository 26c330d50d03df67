use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddCartItemRequest, CartDetail, CartItemDto, QuantityUpdateResponse, UpdateQuantityRequest},
        catalog::{BrandList, CategoryList, CreateNameRequest, TagList},
        discounts::{
            CreateDiscountRequest, DiscountList, DiscountStatusList, DiscountStatusRow,
            DiscountWithProducts, UpdateDiscountRequest,
        },
        favorites::{AddFavoriteRequest, FavoriteProductList},
        orders::{
            CreateOrderRequest, ExportOrdersRequest, OrderDto, OrderLineInput, OrderList,
            OrderWithItems, PayOrderRequest, PaymentReceipt,
        },
        products::{CreateProductRequest, ProductDetail, ProductList, StorefrontSummary, UpdateProductRequest},
        reviews::{ReviewInput, ReviewList, ReviewSubmitResponse, UpdateReviewRequest},
    },
    models::{
        Brand, CartItem, Category, Discount, Favorite, Order, OrderItem, OrderStatus, Payment,
        PaymentMethod, Product, Review, Tag, User,
    },
    pricing::{CartQuote, QuantityAction, ScheduleStatus},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, catalog, discounts, favorites, health, orders, params, products, reviews},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::storefront,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_reviews,
        products::add_review,
        catalog::list_categories,
        catalog::create_category,
        catalog::list_brands,
        catalog::create_brand,
        catalog::list_tags,
        catalog::create_tag,
        discounts::list_discounts,
        discounts::get_discount,
        discounts::create_discount,
        discounts::update_discount,
        discounts::delete_discount,
        cart::cart_detail,
        cart::add_item,
        cart::update_quantity,
        cart::remove_item,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::pay_order,
        reviews::update_review,
        reviews::delete_review,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        admin::list_all_orders,
        admin::create_order,
        admin::get_order_admin,
        admin::update_order_status,
        admin::export_orders,
        admin::list_discount_status,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            User,
            Category,
            Brand,
            Tag,
            Product,
            Discount,
            CartItem,
            Order,
            OrderItem,
            Payment,
            Review,
            Favorite,
            OrderStatus,
            PaymentMethod,
            CartQuote,
            QuantityAction,
            ScheduleStatus,
            CreateNameRequest,
            CategoryList,
            BrandList,
            TagList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductDetail,
            StorefrontSummary,
            CreateDiscountRequest,
            UpdateDiscountRequest,
            DiscountList,
            DiscountWithProducts,
            DiscountStatusRow,
            DiscountStatusList,
            AddCartItemRequest,
            UpdateQuantityRequest,
            CartItemDto,
            CartDetail,
            QuantityUpdateResponse,
            OrderLineInput,
            CreateOrderRequest,
            PayOrderRequest,
            OrderDto,
            OrderWithItems,
            OrderList,
            PaymentReceipt,
            ExportOrdersRequest,
            ReviewInput,
            UpdateReviewRequest,
            ReviewList,
            ReviewSubmitResponse,
            AddFavoriteRequest,
            FavoriteProductList,
            admin::ProductList,
            admin::UpdateOrderStatusRequest,
            admin::InventoryAdjustRequest,
            admin::LowStockQuery,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CartDetail>,
            ApiResponse<DiscountStatusList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog and storefront endpoints"),
        (name = "Catalog", description = "Categories, brands and tags"),
        (name = "Discounts", description = "Discount endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order and payment endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
