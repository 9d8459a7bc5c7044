mod common;

use flavorhub_api::{
    domain::UserRole,
    dto::{
        orders::{CreateOrderRequest, OrderLineRequest},
        reservations::CreateReservationRequest,
        restaurants::UpdateRestaurantRequest,
    },
    error::AppError,
    routes::params::MenuQuery,
    services::{menu_service, order_service, reservation_service, restaurant_service},
};

#[tokio::test]
async fn restaurants_with_history_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;

    let with_order = common::create_restaurant(&state, &partner).await?;
    let wrap = common::create_menu_item(&state, &partner, with_order.id, "Wrap", 700).await?;
    order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            restaurant_id: with_order.id,
            delivery_address: None,
            notes: None,
            items: vec![OrderLineRequest {
                menu_item_id: wrap.id,
                quantity: 1,
            }],
        },
    )
    .await?;

    let refused = restaurant_service::delete_restaurant(&state, &partner, with_order.id).await;
    assert!(matches!(refused, Err(AppError::BadRequest(_))));

    let referenced =
        menu_service::delete_menu_item(&state, &partner, with_order.id, wrap.id).await;
    assert!(matches!(referenced, Err(AppError::BadRequest(_))));

    let with_reservation = common::create_restaurant(&state, &partner).await?;
    reservation_service::create_reservation(
        &state,
        &customer,
        CreateReservationRequest {
            restaurant_id: with_reservation.id,
            reserved_for: chrono::Utc::now() + chrono::Duration::days(3),
            party_size: 2,
            special_requests: None,
        },
    )
    .await?;
    let refused =
        restaurant_service::delete_restaurant(&state, &partner, with_reservation.id).await;
    assert!(matches!(refused, Err(AppError::BadRequest(_))));

    // Without history both deletes go through.
    let fresh = common::create_restaurant(&state, &partner).await?;
    let unused = common::create_menu_item(&state, &partner, fresh.id, "Unused", 100).await?;
    menu_service::delete_menu_item(&state, &partner, fresh.id, unused.id).await?;
    restaurant_service::delete_restaurant(&state, &partner, fresh.id).await?;
    let gone = restaurant_service::get_restaurant(&state, Some(&partner), fresh.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    let rival = common::create_user(&state, UserRole::Partner).await?;
    let not_owner = restaurant_service::delete_restaurant(&state, &rival, with_order.id).await;
    assert!(matches!(not_owner, Err(AppError::Forbidden)));

    Ok(())
}

#[tokio::test]
async fn inactive_restaurant_menu_is_owner_only() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;
    common::create_menu_item(&state, &partner, restaurant.id, "Laksa", 1200).await?;

    let public = menu_service::list_menu(&state, None, restaurant.id, MenuQuery::default()).await?;
    assert_eq!(public.data.expect("menu").items.len(), 1);
    let meta = public.meta.expect("meta");
    assert_eq!(meta.page, Some(1));
    assert_eq!(meta.per_page, Some(20));
    assert_eq!(meta.total, Some(1));

    restaurant_service::update_restaurant(
        &state,
        &partner,
        restaurant.id,
        UpdateRestaurantRequest {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await?;

    let anonymous =
        menu_service::list_menu(&state, None, restaurant.id, MenuQuery::default()).await;
    assert!(matches!(anonymous, Err(AppError::NotFound)));
    let as_customer =
        menu_service::list_menu(&state, Some(&customer), restaurant.id, MenuQuery::default())
            .await;
    assert!(matches!(as_customer, Err(AppError::NotFound)));

    let as_owner =
        menu_service::list_menu(&state, Some(&partner), restaurant.id, MenuQuery::default())
            .await?;
    assert_eq!(as_owner.data.expect("menu").items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn empty_menu_reports_requested_page_size() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;

    let resp = menu_service::list_menu(
        &state,
        None,
        restaurant.id,
        MenuQuery {
            per_page: Some(5),
            ..Default::default()
        },
    )
    .await?;
    assert!(resp.data.expect("menu").items.is_empty());
    let meta = resp.meta.expect("meta");
    assert_eq!(meta.per_page, Some(5));
    assert_eq!(meta.total, Some(0));

    Ok(())
}
