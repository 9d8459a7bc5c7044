#![allow(dead_code)]

use flavorhub_api::{
    config::AuthSettings,
    db::{create_orm_conn, run_migrations},
    domain::UserRole,
    dto::{menu_items::CreateMenuItemRequest, restaurants::CreateRestaurantRequest},
    entity::users::ActiveModel as UserActive,
    middleware::auth::AuthUser,
    models::{MenuItem, Restaurant},
    services::{menu_service, restaurant_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// Connects to the test database, or returns `None` so the caller can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState {
        orm,
        auth: AuthSettings {
            jwt_secret: "integration-secret".into(),
            token_ttl_hours: 1,
        },
    }))
}

// Emails are unique per run so tests never need to truncate shared tables.
pub async fn create_user(state: &AppState, role: UserRole) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        email: Set(format!("{}@flow.test", id.simple())),
        password_hash: Set("dummy".into()),
        full_name: Set("Flow Tester".into()),
        phone: Set(None),
        role: Set(role),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser { user_id: id, role })
}

pub async fn create_restaurant(state: &AppState, partner: &AuthUser) -> anyhow::Result<Restaurant> {
    let resp = restaurant_service::create_restaurant(
        state,
        partner,
        CreateRestaurantRequest {
            name: "Flow Kitchen".into(),
            description: None,
            cuisine: Some("Thai".into()),
            address: "12 Test Lane".into(),
            phone: None,
            opening_hours: None,
            image_url: None,
        },
    )
    .await?;
    Ok(resp.data.expect("restaurant"))
}

pub async fn create_menu_item(
    state: &AppState,
    partner: &AuthUser,
    restaurant_id: Uuid,
    name: &str,
    price: i64,
) -> anyhow::Result<MenuItem> {
    let resp = menu_service::create_menu_item(
        state,
        partner,
        restaurant_id,
        CreateMenuItemRequest {
            name: name.into(),
            description: None,
            price,
            category: Some("Mains".into()),
            is_available: None,
        },
    )
    .await?;
    Ok(resp.data.expect("menu item"))
}
