use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::restaurants::{CreateRestaurantRequest, RestaurantList, UpdateRestaurantRequest},
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        reservations::{Column as ReservationCol, Entity as Reservations},
        restaurants::{
            ActiveModel as RestaurantActive, Column as RestaurantCol, Entity as Restaurants,
            Model as RestaurantModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_partner},
    models::Restaurant,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, RestaurantQuery, SortOrder},
    state::AppState,
};

pub async fn list_restaurants(
    state: &AppState,
    query: RestaurantQuery,
) -> AppResult<ApiResponse<RestaurantList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(RestaurantCol::IsActive.eq(true));

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(RestaurantCol::Name).ilike(pattern.clone()))
                .add(Expr::col(RestaurantCol::Description).ilike(pattern)),
        );
    }

    if let Some(cuisine) = query.cuisine.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(RestaurantCol::Cuisine).ilike(cuisine.to_string()));
    }

    let mut finder = Restaurants::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => finder.order_by_asc(RestaurantCol::Name),
        SortOrder::Desc => finder.order_by_desc(RestaurantCol::Name),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Restaurant::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Restaurants",
        RestaurantList { items },
        Some(meta),
    ))
}

pub async fn list_my_restaurants(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<RestaurantList>> {
    ensure_partner(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Restaurants::find()
        .filter(RestaurantCol::PartnerId.eq(user.user_id))
        .order_by_desc(RestaurantCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Restaurant::from)
        .collect();

    Ok(ApiResponse::success(
        "My restaurants",
        RestaurantList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_restaurant(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Restaurant>> {
    let restaurant = find_visible_restaurant(&state.orm, viewer, id).await?;

    Ok(ApiResponse::success(
        "Restaurant",
        Restaurant::from(restaurant),
        None,
    ))
}

pub async fn create_restaurant(
    state: &AppState,
    user: &AuthUser,
    payload: CreateRestaurantRequest,
) -> AppResult<ApiResponse<Restaurant>> {
    ensure_partner(user)?;
    let name = required(payload.name, "name")?;
    let address = required(payload.address, "address")?;

    let restaurant = RestaurantActive {
        id: Set(Uuid::new_v4()),
        partner_id: Set(user.user_id),
        name: Set(name),
        description: Set(payload.description),
        cuisine: Set(payload.cuisine),
        address: Set(address),
        phone: Set(payload.phone),
        opening_hours: Set(payload.opening_hours),
        image_url: Set(payload.image_url),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "restaurant_create",
        "restaurants",
        serde_json::json!({ "restaurant_id": restaurant.id }),
    )
    .await;

    Ok(ApiResponse::item(
        "Restaurant created",
        Restaurant::from(restaurant),
    ))
}

pub async fn update_restaurant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateRestaurantRequest,
) -> AppResult<ApiResponse<Restaurant>> {
    let existing = find_owned_restaurant(&state.orm, user, id).await?;

    let mut active: RestaurantActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(required(name, "name")?);
    }
    if let Some(address) = payload.address {
        active.address = Set(required(address, "address")?);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(cuisine) = payload.cuisine {
        active.cuisine = Set(Some(cuisine));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(opening_hours) = payload.opening_hours {
        active.opening_hours = Set(Some(opening_hours));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let restaurant = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "restaurant_update",
        "restaurants",
        serde_json::json!({ "restaurant_id": restaurant.id }),
    )
    .await;

    Ok(ApiResponse::item("Updated", Restaurant::from(restaurant)))
}

pub async fn delete_restaurant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let restaurant = find_owned_restaurant(&state.orm, user, id).await?;

    let orders = Orders::find()
        .filter(OrderCol::RestaurantId.eq(restaurant.id))
        .count(&state.orm)
        .await?;
    let reservations = Reservations::find()
        .filter(ReservationCol::RestaurantId.eq(restaurant.id))
        .count(&state.orm)
        .await?;
    if orders > 0 || reservations > 0 {
        return Err(AppError::BadRequest(
            "restaurant has order or reservation history, deactivate it instead".into(),
        ));
    }

    let result = Restaurants::delete_by_id(restaurant.id)
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.orm,
        user.user_id,
        "restaurant_delete",
        "restaurants",
        serde_json::json!({ "restaurant_id": id }),
    )
    .await;

    Ok(ApiResponse::item("Deleted", serde_json::json!({})))
}

/// Loads a restaurant the caller owns. Partners asking for someone else's
/// restaurant get `Forbidden`; non-partners are rejected before the lookup.
pub(crate) async fn find_owned_restaurant<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<RestaurantModel> {
    ensure_partner(user)?;
    let restaurant = Restaurants::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if restaurant.partner_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(restaurant)
}

/// Loads a restaurant that is open for new orders and reservations.
/// Inactive restaurants are visible to their owner only; everyone else gets `NotFound`.
pub(crate) async fn find_visible_restaurant<C: ConnectionTrait>(
    conn: &C,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<RestaurantModel> {
    let restaurant = Restaurants::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let is_owner = viewer.is_some_and(|u| u.user_id == restaurant.partner_id);
    if !restaurant.is_active && !is_owner {
        return Err(AppError::NotFound);
    }
    Ok(restaurant)
}

pub(crate) async fn find_active_restaurant<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<RestaurantModel> {
    let restaurant = Restaurants::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("restaurant not found".into()))?;
    if !restaurant.is_active {
        return Err(AppError::BadRequest(
            "restaurant is not accepting customers".into(),
        ));
    }
    Ok(restaurant)
}

/// Ids of every restaurant owned by `partner_id`.
pub(crate) async fn owned_restaurant_ids<C: ConnectionTrait>(
    conn: &C,
    partner_id: Uuid,
) -> AppResult<Vec<Uuid>> {
    let ids = Restaurants::find()
        .select_only()
        .column(RestaurantCol::Id)
        .filter(RestaurantCol::PartnerId.eq(partner_id))
        .into_tuple::<Uuid>()
        .all(conn)
        .await?;
    Ok(ids)
}

pub(crate) fn required(value: String, field: &str) -> AppResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value)
}
