use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{OrderStatus, UserRole, line_total, order_total, status::ensure_order_transition},
    dto::orders::{
        CreateOrderRequest, OrderLineRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest,
    },
    entity::{
        menu_items::{Column as MenuCol, Entity as MenuItems, Model as MenuItemModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payments::{Column as PaymentCol, Entity as Payments},
        restaurants::Entity as Restaurants,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        payment_service::active_statuses,
        restaurant_service::{find_active_restaurant, owned_restaurant_ids},
    },
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    let txn = state.orm.begin().await?;

    let restaurant = find_active_restaurant(&txn, payload.restaurant_id).await?;

    // Repeated menu items in one request collapse into a single line.
    let mut lines: Vec<(MenuItemModel, i32)> = Vec::new();
    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".into(),
            ));
        }
        match lines.iter_mut().find(|(item, _)| item.id == line.menu_item_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
            }
            None => {
                let item = find_orderable_item(&txn, restaurant.id, line.menu_item_id).await?;
                lines.push((item, line.quantity));
            }
        }
    }

    let priced = lines
        .iter()
        .map(|(item, quantity)| line_total(item.price, *quantity))
        .collect::<AppResult<Vec<i64>>>()?;
    let total_amount = order_total(priced.iter().copied())?;

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(build_order_number(order_id)),
        customer_id: Set(user.user_id),
        restaurant_id: Set(restaurant.id),
        status: Set(OrderStatus::Pending),
        total_amount: Set(total_amount),
        delivery_address: Set(payload.delivery_address),
        notes: Set(payload.notes),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for ((menu_item, quantity), total_price) in lines.into_iter().zip(priced) {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            menu_item_id: Set(menu_item.id),
            quantity: Set(quantity),
            unit_price: Set(menu_item.price),
            total_price: Set(total_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        restaurant_id = %restaurant.id,
        total_amount = order.total_amount,
        "order created"
    );
    audit::record(
        &state.orm,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::item(
        "Order created",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    match user.role {
        UserRole::Customer => {
            condition = condition.add(OrderCol::CustomerId.eq(user.user_id));
            if let Some(restaurant_id) = query.restaurant_id {
                condition = condition.add(OrderCol::RestaurantId.eq(restaurant_id));
            }
        }
        UserRole::Partner => {
            let owned = owned_restaurant_ids(&state.orm, user.user_id).await?;
            let scope = match query.restaurant_id {
                Some(id) if owned.contains(&id) => vec![id],
                Some(_) => return Err(AppError::Forbidden),
                None => owned,
            };
            condition = condition.add(OrderCol::RestaurantId.is_in(scope));
        }
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_visible_order(&state.orm, user, id).await?;
    let items = load_items(&state.orm, order.id).await?;

    Ok(ApiResponse::item(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items: items.into_iter().map(OrderItem::from).collect(),
        },
    ))
}

pub async fn add_order_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: OrderLineRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }
    let txn = state.orm.begin().await?;

    let order = lock_editable_order(&txn, user, order_id).await?;
    let menu_item = find_orderable_item(&txn, order.restaurant_id, payload.menu_item_id).await?;

    let existing = OrderItems::find()
        .filter(
            Condition::all()
                .add(OrderItemCol::OrderId.eq(order.id))
                .add(OrderItemCol::MenuItemId.eq(menu_item.id)),
        )
        .one(&txn)
        .await?;

    match existing {
        Some(line) => {
            let quantity = line
                .quantity
                .checked_add(payload.quantity)
                .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
            let total_price = line_total(line.unit_price, quantity)?;
            let mut active: OrderItemActive = line.into();
            active.quantity = Set(quantity);
            active.total_price = Set(total_price);
            active.update(&txn).await?;
        }
        None => {
            let total_price = line_total(menu_item.price, payload.quantity)?;
            OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                menu_item_id: Set(menu_item.id),
                quantity: Set(payload.quantity),
                unit_price: Set(menu_item.price),
                total_price: Set(total_price),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
    }

    let (order, items) = recalculate_total(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_item_add",
        "order_items",
        serde_json::json!({
            "order_id": order.id,
            "menu_item_id": menu_item.id,
            "quantity": payload.quantity,
            "total_amount": order.total_amount,
        }),
    )
    .await;

    Ok(ApiResponse::item(
        "Item added",
        OrderWithItems {
            order: Order::from(order),
            items: items.into_iter().map(OrderItem::from).collect(),
        },
    ))
}

pub async fn remove_order_item(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    item_id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;
    let txn = state.orm.begin().await?;

    let order = lock_editable_order(&txn, user, order_id).await?;

    let result = OrderItems::delete_many()
        .filter(
            Condition::all()
                .add(OrderItemCol::Id.eq(item_id))
                .add(OrderItemCol::OrderId.eq(order.id)),
        )
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let (order, items) = recalculate_total(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_item_remove",
        "order_items",
        serde_json::json!({
            "order_id": order.id,
            "order_item_id": item_id,
            "total_amount": order.total_amount,
        }),
    )
    .await;

    Ok(ApiResponse::item(
        "Item removed",
        OrderWithItems {
            order: Order::from(order),
            items: items.into_iter().map(OrderItem::from).collect(),
        },
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let existing = find_visible_order(&state.orm, user, id).await?;
    let next = payload.status;

    if user.role == UserRole::Customer {
        if next != OrderStatus::Cancelled {
            return Err(AppError::Forbidden);
        }
        if existing.status != OrderStatus::Pending {
            return Err(AppError::BadRequest(
                "order can no longer be cancelled by the customer".into(),
            ));
        }
    }
    ensure_order_transition(existing.status, next)?;

    let previous = existing.status;
    let mut active: OrderActive = existing.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %next, "order status changed");
    audit::record(
        &state.orm,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": previous, "to": next }),
    )
    .await;

    Ok(ApiResponse::item("Order updated", Order::from(order)))
}

/// Recomputes `total_amount` from the order's current lines and stores it.
async fn recalculate_total<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
    let items = load_items(conn, order.id).await?;
    let total_amount = order_total(items.iter().map(|item| item.total_price))?;

    let mut active: OrderActive = order.into();
    active.total_amount = Set(total_amount);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(conn).await?;

    Ok((order, items))
}

async fn load_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?;
    Ok(items)
}

/// Locks the caller's order for the rest of the transaction, refusing orders
/// whose lines are frozen by status or by a pending, processing or completed
/// payment.
async fn lock_editable_order<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderModel> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(user.user_id))
                .add(OrderCol::Id.eq(order_id)),
        )
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    if !order.status.accepts_item_changes() {
        return Err(AppError::BadRequest(format!(
            "items cannot change once the order is {}",
            order.status
        )));
    }

    let held_by_payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .filter(PaymentCol::Status.is_in(active_statuses()))
        .count(conn)
        .await?;
    if held_by_payment > 0 {
        return Err(AppError::BadRequest(
            "items cannot change while the order has an active payment".into(),
        ));
    }
    Ok(order)
}

async fn find_orderable_item<C: ConnectionTrait>(
    conn: &C,
    restaurant_id: Uuid,
    menu_item_id: Uuid,
) -> AppResult<MenuItemModel> {
    let item = MenuItems::find_by_id(menu_item_id)
        .filter(MenuCol::RestaurantId.eq(restaurant_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "menu item {menu_item_id} is not on this restaurant's menu"
            ))
        })?;
    if !item.is_available {
        return Err(AppError::BadRequest(format!(
            "menu item {} is currently unavailable",
            item.name
        )));
    }
    Ok(item)
}

/// Loads an order visible to `user`: the ordering customer or the partner
/// owning the restaurant. Anyone else sees `NotFound`.
pub(crate) async fn find_visible_order<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let visible = match user.role {
        UserRole::Customer => order.customer_id == user.user_id,
        UserRole::Partner => Restaurants::find_by_id(order.restaurant_id)
            .one(conn)
            .await?
            .is_some_and(|r| r.partner_id == user.user_id),
    };
    if !visible {
        return Err(AppError::NotFound);
    }
    Ok(order)
}

fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    format!("ORD-{}-{}", date, &suffix[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::build_order_number;
    use uuid::Uuid;

    #[test]
    fn order_number_has_date_and_id_prefix() {
        let id = Uuid::parse_str("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap();
        let number = build_order_number(id);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], "1B4E28BA");
    }
}
