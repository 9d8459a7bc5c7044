use flavorhub_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    domain::UserRole,
    entity::{menu_items, restaurants, users},
    services::auth_service::hash_password,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let partner_id = ensure_user(
        &orm,
        "partner@example.com",
        "partner123",
        "Demo Partner",
        UserRole::Partner,
    )
    .await?;
    let customer_id = ensure_user(
        &orm,
        "customer@example.com",
        "customer123",
        "Demo Customer",
        UserRole::Customer,
    )
    .await?;
    let restaurant_id = ensure_restaurant(&orm, partner_id, "Ferris Bistro").await?;
    seed_menu(&orm, restaurant_id).await?;

    println!(
        "Seed completed. Partner ID: {partner_id}, Customer ID: {customer_id}, Restaurant ID: {restaurant_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    password: &str,
    full_name: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        full_name: Set(full_name.to_string()),
        phone: Set(None),
        role: Set(role),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role:?})");
    Ok(user.id)
}

async fn ensure_restaurant(
    orm: &DatabaseConnection,
    partner_id: Uuid,
    name: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = restaurants::Entity::find()
        .filter(restaurants::Column::PartnerId.eq(partner_id))
        .filter(restaurants::Column::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let restaurant = restaurants::ActiveModel {
        id: Set(Uuid::new_v4()),
        partner_id: Set(partner_id),
        name: Set(name.to_string()),
        description: Set(Some("Small plates for Rustaceans".to_string())),
        cuisine: Set(Some("Fusion".to_string())),
        address: Set("1 Crab Street".to_string()),
        phone: Set(None),
        opening_hours: Set(Some("10:00-22:00".to_string())),
        image_url: Set(None),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Seeded restaurant {name}");
    Ok(restaurant.id)
}

async fn seed_menu(orm: &DatabaseConnection, restaurant_id: Uuid) -> anyhow::Result<()> {
    let items = vec![
        ("Crab Cakes", "Pan-fried, with lemon aioli", 45000, "Starters"),
        ("Borrowed Noodles", "Hand-pulled, chili oil", 65000, "Mains"),
        ("Lifetime Curry", "Slow-cooked beef curry", 72000, "Mains"),
        ("Async Affogato", "Espresso over vanilla gelato", 30000, "Desserts"),
    ];

    for (name, desc, price, category) in items {
        let exists = menu_items::Entity::find()
            .filter(menu_items::Column::RestaurantId.eq(restaurant_id))
            .filter(menu_items::Column::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        menu_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            restaurant_id: Set(restaurant_id),
            name: Set(name.to_string()),
            description: Set(Some(desc.to_string())),
            price: Set(price),
            category: Set(Some(category.to_string())),
            is_available: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
