use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod doc;
pub mod health;
pub mod menu_items;
pub mod orders;
pub mod params;
pub mod payments;
pub mod reservations;
pub mod restaurants;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest(
            "/restaurants",
            restaurants::router().merge(menu_items::router()),
        )
        .nest("/reservations", reservations::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
}
