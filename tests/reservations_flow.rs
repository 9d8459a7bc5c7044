mod common;

use chrono::{Duration, Utc};
use flavorhub_api::{
    domain::{PaymentMethod, PaymentStatus, PaymentType, ReservationStatus, UserRole},
    dto::{
        payments::CreatePaymentRequest,
        reservations::{CreateReservationRequest, UpdateReservationStatusRequest},
    },
    error::AppError,
    routes::params::ReservationListQuery,
    services::{payment_service, reservation_service},
};

#[tokio::test]
async fn reservation_deposit_and_partner_confirmation() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;

    let past = reservation_service::create_reservation(
        &state,
        &customer,
        CreateReservationRequest {
            restaurant_id: restaurant.id,
            reserved_for: Utc::now() - Duration::hours(1),
            party_size: 2,
            special_requests: None,
        },
    )
    .await;
    assert!(matches!(past, Err(AppError::BadRequest(_))));

    let reservation = reservation_service::create_reservation(
        &state,
        &customer,
        CreateReservationRequest {
            restaurant_id: restaurant.id,
            reserved_for: Utc::now() + Duration::days(2),
            party_size: 4,
            special_requests: Some("window seat".into()),
        },
    )
    .await?
    .data
    .expect("reservation");
    assert_eq!(reservation.status, ReservationStatus::Pending);

    let listed = reservation_service::list_reservations(
        &state,
        &partner,
        ReservationListQuery {
            restaurant_id: Some(restaurant.id),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("reservations");
    assert!(listed.items.iter().any(|r| r.id == reservation.id));

    // Reservation payments must name only the reservation.
    let both_targets = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Reservation,
            order_id: Some(reservation.id),
            reservation_id: Some(reservation.id),
            amount: Some(2000),
            method: PaymentMethod::Card,
        },
    )
    .await;
    assert!(matches!(both_targets, Err(AppError::BadRequest(_))));

    let deposit = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Reservation,
            order_id: None,
            reservation_id: Some(reservation.id),
            amount: Some(2000),
            method: PaymentMethod::Card,
        },
    )
    .await?
    .data
    .expect("payment");
    assert_eq!(deposit.order_id, None);

    let settled = payment_service::process_payment(&state, &customer, deposit.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(settled.status, PaymentStatus::Completed);

    let customer_confirm = reservation_service::update_reservation_status(
        &state,
        &customer,
        reservation.id,
        UpdateReservationStatusRequest {
            status: ReservationStatus::Confirmed,
        },
    )
    .await;
    assert!(matches!(customer_confirm, Err(AppError::Forbidden)));

    let confirmed = reservation_service::update_reservation_status(
        &state,
        &partner,
        reservation.id,
        UpdateReservationStatusRequest {
            status: ReservationStatus::Confirmed,
        },
    )
    .await?
    .data
    .expect("reservation");
    assert_eq!(confirmed.status, ReservationStatus::Confirmed);

    let completed = reservation_service::update_reservation_status(
        &state,
        &partner,
        reservation.id,
        UpdateReservationStatusRequest {
            status: ReservationStatus::Completed,
        },
    )
    .await?
    .data
    .expect("reservation");
    assert_eq!(completed.status, ReservationStatus::Completed);

    let reopen = reservation_service::update_reservation_status(
        &state,
        &partner,
        reservation.id,
        UpdateReservationStatusRequest {
            status: ReservationStatus::Pending,
        },
    )
    .await;
    assert!(matches!(reopen, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn oversized_party_is_rejected() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;

    let result = reservation_service::create_reservation(
        &state,
        &customer,
        CreateReservationRequest {
            restaurant_id: restaurant.id,
            reserved_for: Utc::now() + Duration::days(1),
            party_size: 51,
            special_requests: None,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    Ok(())
}
