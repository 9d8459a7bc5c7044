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
    domain::{
        OrderStatus, PaymentMethod, PaymentStatus, PaymentType, ReservationStatus, UserRole,
    },
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        menu_items::{CreateMenuItemRequest, MenuItemList, UpdateMenuItemRequest},
        orders::{
            CreateOrderRequest, OrderLineRequest, OrderList, OrderWithItems,
            UpdateOrderStatusRequest,
        },
        payments::{CreatePaymentRequest, PaymentList, RefundPaymentRequest},
        reservations::{
            CreateReservationRequest, ReservationList, UpdateReservationStatusRequest,
        },
        restaurants::{CreateRestaurantRequest, RestaurantList, UpdateRestaurantRequest},
    },
    models::{MenuItem, Order, OrderItem, Payment, Reservation, Restaurant, User},
    response::{ApiResponse, Meta},
    routes::{
        auth, health, menu_items, orders, params, payments, reservations, restaurants,
    },
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
        health::readiness_check,
        auth::register,
        auth::login,
        auth::me,
        restaurants::list_restaurants,
        restaurants::list_my_restaurants,
        restaurants::get_restaurant,
        restaurants::create_restaurant,
        restaurants::update_restaurant,
        restaurants::delete_restaurant,
        menu_items::list_menu,
        menu_items::create_menu_item,
        menu_items::update_menu_item,
        menu_items::delete_menu_item,
        reservations::list_reservations,
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::update_reservation_status,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::add_order_item,
        orders::remove_order_item,
        orders::update_order_status,
        payments::list_payments,
        payments::create_payment,
        payments::get_payment,
        payments::process_payment,
        payments::refund_payment
    ),
    components(
        schemas(
            User,
            Restaurant,
            MenuItem,
            Reservation,
            Order,
            OrderItem,
            Payment,
            UserRole,
            OrderStatus,
            ReservationStatus,
            PaymentStatus,
            PaymentType,
            PaymentMethod,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateRestaurantRequest,
            UpdateRestaurantRequest,
            RestaurantList,
            CreateMenuItemRequest,
            UpdateMenuItemRequest,
            MenuItemList,
            CreateReservationRequest,
            UpdateReservationStatusRequest,
            ReservationList,
            CreateOrderRequest,
            OrderLineRequest,
            UpdateOrderStatusRequest,
            OrderWithItems,
            OrderList,
            CreatePaymentRequest,
            RefundPaymentRequest,
            PaymentList,
            params::Pagination,
            params::SortOrder,
            Meta,
            health::HealthData,
            ApiResponse<User>,
            ApiResponse<Restaurant>,
            ApiResponse<RestaurantList>,
            ApiResponse<MenuItem>,
            ApiResponse<MenuItemList>,
            ApiResponse<Reservation>,
            ApiResponse<ReservationList>,
            ApiResponse<Order>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Payment>,
            ApiResponse<PaymentList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Registration, login and current user"),
        (name = "Restaurants", description = "Restaurant profiles managed by partners"),
        (name = "Menu", description = "Restaurant menu items"),
        (name = "Reservations", description = "Table reservations"),
        (name = "Orders", description = "Orders and their line items"),
        (name = "Payments", description = "Order and reservation payments"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
