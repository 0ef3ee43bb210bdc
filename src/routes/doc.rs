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
    catalog::CatalogSource,
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        catalog::{CatalogList, CatalogUploadForm},
        dashboard::DashboardStats,
        orders::{
            DeliveryInfo, OrderCreated, OrderItemView, OrderLineRequest, OrderList,
            OrderWithItems, PlaceOrderRequest, UpdateOrderStatusRequest,
        },
    },
    models::{CatalogItem, Order, OrderItem, OrderStatus, User},
    response::{ApiResponse, ErrorResponse, Meta},
    routes::{auth, catalog, health, orders, params},
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
        auth::register,
        auth::login,
        catalog::list_items,
        catalog::get_item,
        catalog::create_item,
        catalog::update_item,
        catalog::delete_item,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::dashboard
    ),
    components(
        schemas(
            User,
            CatalogSource,
            CatalogItem,
            CatalogList,
            CatalogUploadForm,
            Order,
            OrderItem,
            OrderStatus,
            OrderItemView,
            OrderWithItems,
            OrderList,
            OrderCreated,
            DeliveryInfo,
            OrderLineRequest,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            DashboardStats,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ErrorResponse,
            params::Pagination,
            params::CatalogQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<CatalogItem>,
            ApiResponse<CatalogList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<DashboardStats>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Catalog", description = "Products and electronics catalog endpoints"),
        (name = "Orders", description = "Order placement, history and administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
