use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::menu_items::{CreateMenuItemRequest, MenuItemList, UpdateMenuItemRequest},
    entity::{
        menu_items::{
            ActiveModel as MenuItemActive, Column as MenuCol, Entity as MenuItems,
            Model as MenuItemModel,
        },
        order_items::{Column as OrderItemCol, Entity as OrderItems},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::MenuItem,
    response::{ApiResponse, Meta},
    routes::params::MenuQuery,
    services::restaurant_service::{find_owned_restaurant, find_visible_restaurant, required},
    state::AppState,
};

pub async fn list_menu(
    state: &AppState,
    viewer: Option<&AuthUser>,
    restaurant_id: Uuid,
    query: MenuQuery,
) -> AppResult<ApiResponse<MenuItemList>> {
    find_visible_restaurant(&state.orm, viewer, restaurant_id).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(MenuCol::RestaurantId.eq(restaurant_id));
    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(MenuCol::Category.eq(category.clone()));
    }
    if query.available_only.unwrap_or(false) {
        condition = condition.add(MenuCol::IsAvailable.eq(true));
    }

    let finder = MenuItems::find()
        .filter(condition)
        .order_by_asc(MenuCol::Category)
        .order_by_asc(MenuCol::Name);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(MenuItem::from)
        .collect();

    Ok(ApiResponse::success(
        "Menu",
        MenuItemList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_menu_item(
    state: &AppState,
    user: &AuthUser,
    restaurant_id: Uuid,
    payload: CreateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    let restaurant = find_owned_restaurant(&state.orm, user, restaurant_id).await?;
    let name = required(payload.name, "name")?;
    validate_price(payload.price)?;

    let item = MenuItemActive {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant.id),
        name: Set(name),
        description: Set(payload.description),
        price: Set(payload.price),
        category: Set(payload.category),
        is_available: Set(payload.is_available.unwrap_or(true)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "menu_item_create",
        "menu_items",
        serde_json::json!({ "restaurant_id": restaurant.id, "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::item("Menu item created", MenuItem::from(item)))
}

pub async fn update_menu_item(
    state: &AppState,
    user: &AuthUser,
    restaurant_id: Uuid,
    item_id: Uuid,
    payload: UpdateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    let existing = find_owned_item(state, user, restaurant_id, item_id).await?;

    let mut active: MenuItemActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(required(name, "name")?);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(category) = payload.category {
        active.category = Set(Some(category));
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "menu_item_update",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::item("Updated", MenuItem::from(item)))
}

pub async fn delete_menu_item(
    state: &AppState,
    user: &AuthUser,
    restaurant_id: Uuid,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let item = find_owned_item(state, user, restaurant_id, item_id).await?;

    let referenced = OrderItems::find()
        .filter(OrderItemCol::MenuItemId.eq(item.id))
        .count(&state.orm)
        .await?;
    if referenced > 0 {
        return Err(AppError::BadRequest(
            "menu item appears on orders, mark it unavailable instead".into(),
        ));
    }

    MenuItems::delete_by_id(item.id).exec(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "menu_item_delete",
        "menu_items",
        serde_json::json!({ "menu_item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::item("Deleted", serde_json::json!({})))
}

async fn find_owned_item(
    state: &AppState,
    user: &AuthUser,
    restaurant_id: Uuid,
    item_id: Uuid,
) -> AppResult<MenuItemModel> {
    let restaurant = find_owned_restaurant(&state.orm, user, restaurant_id).await?;
    MenuItems::find_by_id(item_id)
        .filter(MenuCol::RestaurantId.eq(restaurant.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn validate_price(price: i64) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    Ok(())
}
