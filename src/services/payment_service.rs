use chrono::Utc;
use sea_orm::sea_query::{LockType, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    Iterable, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        OrderStatus, PaymentStatus, PaymentTarget, Settlement, UserRole,
        payment::{settle_order_payment, settle_reservation_payment},
        status::ensure_payment_transition,
    },
    dto::payments::{CreatePaymentRequest, PaymentList, RefundPaymentRequest},
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel,
        },
        reservations::{Column as ReservationCol, Entity as Reservations},
        restaurants::Entity as Restaurants,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::Payment,
    response::{ApiResponse, Meta},
    routes::params::PaymentListQuery,
    services::restaurant_service::owned_restaurant_ids,
    state::AppState,
};

pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    ensure_customer(user)?;
    let target =
        PaymentTarget::resolve(payload.payment_type, payload.order_id, payload.reservation_id)?;

    let txn = state.orm.begin().await?;

    // The target row stays locked until commit, so item changes and a second
    // payment attempt for the same target wait for this one.
    let amount = match target {
        PaymentTarget::Order(order_id) => {
            let order = Orders::find_by_id(order_id)
                .filter(OrderCol::CustomerId.eq(user.user_id))
                .lock(LockType::Update)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;
            if order.status == OrderStatus::Cancelled {
                return Err(AppError::BadRequest("order was cancelled".into()));
            }
            if order.total_amount <= 0 {
                return Err(AppError::BadRequest(
                    "order has no items to pay for".into(),
                ));
            }
            let amount = payload.amount.unwrap_or(order.total_amount);
            if amount != order.total_amount {
                return Err(AppError::BadRequest(format!(
                    "amount must equal the order total of {}",
                    order.total_amount
                )));
            }
            amount
        }
        PaymentTarget::Reservation(reservation_id) => {
            let reservation = Reservations::find_by_id(reservation_id)
                .filter(ReservationCol::CustomerId.eq(user.user_id))
                .lock(LockType::Update)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;
            if reservation.status.is_terminal() {
                return Err(AppError::BadRequest(format!(
                    "reservation is already {}",
                    reservation.status
                )));
            }
            match payload.amount {
                Some(amount) if amount > 0 => amount,
                _ => {
                    return Err(AppError::BadRequest(
                        "reservation deposits require a positive amount".into(),
                    ));
                }
            }
        }
    };

    let active_for_target = Payments::find()
        .filter(target_condition(target))
        .filter(PaymentCol::Status.is_in(active_statuses()))
        .count(&txn)
        .await?;
    if active_for_target > 0 {
        return Err(duplicate_payment());
    }

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        payment_type: Set(target.payment_type()),
        order_id: Set(target.order_id()),
        reservation_id: Set(target.reservation_id()),
        amount: Set(amount),
        method: Set(payload.method),
        status: Set(PaymentStatus::Pending),
        transaction_ref: Set(None),
        failure_reason: Set(None),
        processed_at: Set(None),
        refunded_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_payment(),
        _ => AppError::from(err),
    })?;

    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "payment_create",
        "payments",
        serde_json::json!({
            "payment_id": payment.id,
            "payment_type": payment.payment_type,
            "amount": payment.amount,
        }),
    )
    .await;

    Ok(ApiResponse::item("Payment created", Payment::from(payment)))
}

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
    query: PaymentListQuery,
) -> AppResult<ApiResponse<PaymentList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    match user.role {
        UserRole::Customer => {
            condition = condition.add(PaymentCol::UserId.eq(user.user_id));
        }
        UserRole::Partner => {
            let owned = owned_restaurant_ids(&state.orm, user.user_id).await?;
            let order_ids = Query::select()
                .column(OrderCol::Id)
                .from(Orders)
                .and_where(OrderCol::RestaurantId.is_in(owned.clone()))
                .to_owned();
            let reservation_ids = Query::select()
                .column(ReservationCol::Id)
                .from(Reservations)
                .and_where(ReservationCol::RestaurantId.is_in(owned))
                .to_owned();
            condition = condition.add(
                Condition::any()
                    .add(PaymentCol::OrderId.in_subquery(order_ids))
                    .add(PaymentCol::ReservationId.in_subquery(reservation_ids)),
            );
        }
    }
    if let Some(status) = query.status {
        condition = condition.add(PaymentCol::Status.eq(status));
    }
    if let Some(payment_type) = query.payment_type {
        condition = condition.add(PaymentCol::PaymentType.eq(payment_type));
    }

    let finder = Payments::find()
        .filter(condition)
        .order_by_desc(PaymentCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Payment::from)
        .collect();

    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let payment = find_visible_payment(&state.orm, user, id).await?;
    Ok(ApiResponse::item("Payment", Payment::from(payment)))
}

/// Moves a pending payment through `processing` and settles it against the
/// current state of its target.
pub async fn process_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let txn = state.orm.begin().await?;

    let payment = Payments::find()
        .filter(
            Condition::all()
                .add(PaymentCol::Id.eq(id))
                .add(PaymentCol::UserId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_payment_transition(payment.status, PaymentStatus::Processing)?;
    let target = PaymentTarget::resolve(
        payment.payment_type,
        payment.order_id,
        payment.reservation_id,
    )?;
    let amount = payment.amount;

    let mut active: PaymentActive = payment.into();
    active.status = Set(PaymentStatus::Processing);
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&txn).await?;

    let settlement = match target {
        PaymentTarget::Order(order_id) => {
            let order = Orders::find_by_id(order_id)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;
            settle_order_payment(amount, order.status, order.total_amount)
        }
        PaymentTarget::Reservation(reservation_id) => {
            let reservation = Reservations::find_by_id(reservation_id)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;
            settle_reservation_payment(reservation.status)
        }
    };

    let now = Utc::now();
    let mut active: PaymentActive = payment.into();
    match &settlement {
        Settlement::Completed => {
            ensure_payment_transition(PaymentStatus::Processing, PaymentStatus::Completed)?;
            active.status = Set(PaymentStatus::Completed);
            active.transaction_ref = Set(Some(build_transaction_ref(id)));
        }
        Settlement::Failed(reason) => {
            ensure_payment_transition(PaymentStatus::Processing, PaymentStatus::Failed)?;
            active.status = Set(PaymentStatus::Failed);
            active.failure_reason = Set(Some(reason.clone()));
        }
    }
    active.processed_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let payment = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(payment_id = %payment.id, status = %payment.status, "payment processed");
    audit::record(
        &state.orm,
        user.user_id,
        "payment_process",
        "payments",
        serde_json::json!({
            "payment_id": payment.id,
            "status": payment.status,
            "failure_reason": payment.failure_reason,
        }),
    )
    .await;

    let message = match settlement {
        Settlement::Completed => "Payment completed",
        Settlement::Failed(_) => "Payment failed",
    };
    Ok(ApiResponse::item(message, Payment::from(payment)))
}

pub async fn refund_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RefundPaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    let payment = find_visible_payment(&state.orm, user, id).await?;
    ensure_payment_transition(payment.status, PaymentStatus::Refunded)?;

    let now = Utc::now();
    let mut active: PaymentActive = payment.into();
    active.status = Set(PaymentStatus::Refunded);
    active.refunded_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let payment = active.update(&state.orm).await?;

    tracing::info!(payment_id = %payment.id, amount = payment.amount, "payment refunded");
    audit::record(
        &state.orm,
        user.user_id,
        "payment_refund",
        "payments",
        serde_json::json!({
            "payment_id": payment.id,
            "amount": payment.amount,
            "reason": payload.reason,
        }),
    )
    .await;

    Ok(ApiResponse::item("Payment refunded", Payment::from(payment)))
}

/// Loads a payment visible to `user`: the payer, or the partner owning the
/// restaurant behind the payment's order or reservation.
async fn find_visible_payment<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<PaymentModel> {
    let payment = Payments::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let visible = match user.role {
        UserRole::Customer => payment.user_id == user.user_id,
        UserRole::Partner => {
            let restaurant_id = target_restaurant_id(conn, &payment).await?;
            match restaurant_id {
                Some(restaurant_id) => Restaurants::find_by_id(restaurant_id)
                    .one(conn)
                    .await?
                    .is_some_and(|r| r.partner_id == user.user_id),
                None => false,
            }
        }
    };
    if !visible {
        return Err(AppError::NotFound);
    }
    Ok(payment)
}

async fn target_restaurant_id<C: ConnectionTrait>(
    conn: &C,
    payment: &PaymentModel,
) -> AppResult<Option<Uuid>> {
    let target = PaymentTarget::resolve(
        payment.payment_type,
        payment.order_id,
        payment.reservation_id,
    )?;
    let restaurant_id = match target {
        PaymentTarget::Order(order_id) => Orders::find_by_id(order_id)
            .one(conn)
            .await?
            .map(|o| o.restaurant_id),
        PaymentTarget::Reservation(reservation_id) => Reservations::find_by_id(reservation_id)
            .one(conn)
            .await?
            .map(|r| r.restaurant_id),
    };
    Ok(restaurant_id)
}

fn target_condition(target: PaymentTarget) -> Condition {
    match target {
        PaymentTarget::Order(id) => Condition::all().add(PaymentCol::OrderId.eq(id)),
        PaymentTarget::Reservation(id) => Condition::all().add(PaymentCol::ReservationId.eq(id)),
    }
}

fn duplicate_payment() -> AppError {
    AppError::BadRequest("an active payment already exists for this target".into())
}

/// Statuses that hold a target: at most one payment per order or reservation
/// may be in one of these.
pub(crate) fn active_statuses() -> Vec<PaymentStatus> {
    PaymentStatus::iter().filter(|s| s.is_active()).collect()
}

fn build_transaction_ref(payment_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = payment_id.simple().to_string();
    format!("TXN-{}-{}", date, &suffix[..8].to_uppercase())
}
