use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{ReservationStatus, UserRole, status::ensure_reservation_transition},
    dto::reservations::{
        CreateReservationRequest, ReservationList, UpdateReservationStatusRequest,
    },
    entity::{
        reservations::{
            ActiveModel as ReservationActive, Column as ReservationCol, Entity as Reservations,
            Model as ReservationModel,
        },
        restaurants::Entity as Restaurants,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::Reservation,
    response::{ApiResponse, Meta},
    routes::params::ReservationListQuery,
    services::restaurant_service::{find_active_restaurant, owned_restaurant_ids},
    state::AppState,
};

pub const MAX_PARTY_SIZE: i32 = 50;

pub async fn create_reservation(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReservationRequest,
) -> AppResult<ApiResponse<Reservation>> {
    ensure_customer(user)?;
    if !(1..=MAX_PARTY_SIZE).contains(&payload.party_size) {
        return Err(AppError::BadRequest(format!(
            "party_size must be between 1 and {MAX_PARTY_SIZE}"
        )));
    }
    if payload.reserved_for <= Utc::now() {
        return Err(AppError::BadRequest(
            "reserved_for must be in the future".into(),
        ));
    }
    let restaurant = find_active_restaurant(&state.orm, payload.restaurant_id).await?;

    let reservation = ReservationActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        restaurant_id: Set(restaurant.id),
        reserved_for: Set(payload.reserved_for.into()),
        party_size: Set(payload.party_size),
        special_requests: Set(payload.special_requests),
        status: Set(ReservationStatus::Pending),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(reservation_id = %reservation.id, restaurant_id = %restaurant.id, "reservation created");
    audit::record(
        &state.orm,
        user.user_id,
        "reservation_create",
        "reservations",
        serde_json::json!({ "reservation_id": reservation.id, "restaurant_id": restaurant.id }),
    )
    .await;

    Ok(ApiResponse::item(
        "Reservation created",
        Reservation::from(reservation),
    ))
}

pub async fn list_reservations(
    state: &AppState,
    user: &AuthUser,
    query: ReservationListQuery,
) -> AppResult<ApiResponse<ReservationList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    match user.role {
        UserRole::Customer => {
            condition = condition.add(ReservationCol::CustomerId.eq(user.user_id));
            if let Some(restaurant_id) = query.restaurant_id {
                condition = condition.add(ReservationCol::RestaurantId.eq(restaurant_id));
            }
        }
        UserRole::Partner => {
            let owned = owned_restaurant_ids(&state.orm, user.user_id).await?;
            let scope = match query.restaurant_id {
                Some(id) if owned.contains(&id) => vec![id],
                Some(_) => return Err(AppError::Forbidden),
                None => owned,
            };
            condition = condition.add(ReservationCol::RestaurantId.is_in(scope));
        }
    }
    if let Some(status) = query.status {
        condition = condition.add(ReservationCol::Status.eq(status));
    }

    let finder = Reservations::find()
        .filter(condition)
        .order_by_asc(ReservationCol::ReservedFor);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Reservation::from)
        .collect();

    Ok(ApiResponse::success(
        "Reservations",
        ReservationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_reservation(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Reservation>> {
    let reservation = find_visible_reservation(&state.orm, user, id).await?;
    Ok(ApiResponse::item(
        "Reservation",
        Reservation::from(reservation),
    ))
}

pub async fn update_reservation_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReservationStatusRequest,
) -> AppResult<ApiResponse<Reservation>> {
    let existing = find_visible_reservation(&state.orm, user, id).await?;
    let next = payload.status;

    if user.role == UserRole::Customer && next != ReservationStatus::Cancelled {
        return Err(AppError::Forbidden);
    }
    ensure_reservation_transition(existing.status, next)?;

    let previous = existing.status;
    let mut active: ReservationActive = existing.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let reservation = active.update(&state.orm).await?;

    tracing::info!(
        reservation_id = %reservation.id,
        from = %previous,
        to = %next,
        "reservation status changed"
    );
    audit::record(
        &state.orm,
        user.user_id,
        "reservation_status_update",
        "reservations",
        serde_json::json!({
            "reservation_id": reservation.id,
            "from": previous,
            "to": next,
        }),
    )
    .await;

    Ok(ApiResponse::item(
        "Reservation updated",
        Reservation::from(reservation),
    ))
}

/// Loads a reservation visible to `user`: the booking customer or the partner
/// owning the restaurant. Anyone else sees `NotFound`.
pub(crate) async fn find_visible_reservation<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ReservationModel> {
    let reservation = Reservations::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let visible = match user.role {
        UserRole::Customer => reservation.customer_id == user.user_id,
        UserRole::Partner => Restaurants::find_by_id(reservation.restaurant_id)
            .one(conn)
            .await?
            .is_some_and(|r| r.partner_id == user.user_id),
    };
    if !visible {
        return Err(AppError::NotFound);
    }
    Ok(reservation)
}
