mod common;

use flavorhub_api::{
    domain::{OrderStatus, PaymentMethod, PaymentStatus, PaymentType, UserRole},
    dto::{
        orders::{CreateOrderRequest, OrderLineRequest, UpdateOrderStatusRequest},
        payments::{CreatePaymentRequest, RefundPaymentRequest},
    },
    error::AppError,
    routes::params::{OrderListQuery, PaymentListQuery},
    services::{order_service, payment_service},
};

// Customer builds an order, edits its lines, pays, and the partner moves it through the kitchen.
#[tokio::test]
async fn order_lines_drive_total_and_payment_completes() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;
    let curry = common::create_menu_item(&state, &partner, restaurant.id, "Curry", 1500).await?;
    let rice = common::create_menu_item(&state, &partner, restaurant.id, "Rice", 300).await?;

    let created = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            restaurant_id: restaurant.id,
            delivery_address: Some("5 Home Road".into()),
            notes: None,
            items: vec![OrderLineRequest {
                menu_item_id: curry.id,
                quantity: 2,
            }],
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.order.total_amount, 3000);
    assert!(created.order.order_number.starts_with("ORD-"));

    let added = order_service::add_order_item(
        &state,
        &customer,
        created.order.id,
        OrderLineRequest {
            menu_item_id: rice.id,
            quantity: 3,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(added.items.len(), 2);
    assert_eq!(added.order.total_amount, 3900);

    // Adding an item already on the order merges into its line.
    let merged = order_service::add_order_item(
        &state,
        &customer,
        created.order.id,
        OrderLineRequest {
            menu_item_id: curry.id,
            quantity: 1,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(merged.items.len(), 2);
    assert_eq!(merged.order.total_amount, 5400);

    let rice_line = merged
        .items
        .iter()
        .find(|line| line.menu_item_id == rice.id)
        .expect("rice line");
    let removed =
        order_service::remove_order_item(&state, &customer, created.order.id, rice_line.id)
            .await?
            .data
            .expect("order");
    assert_eq!(removed.items.len(), 1);
    assert_eq!(removed.order.total_amount, 4500);
    let line_sum: i64 = removed.items.iter().map(|line| line.total_price).sum();
    assert_eq!(line_sum, removed.order.total_amount);

    let mismatched = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Order,
            order_id: Some(created.order.id),
            reservation_id: None,
            amount: Some(100),
            method: PaymentMethod::Card,
        },
    )
    .await;
    assert!(matches!(mismatched, Err(AppError::BadRequest(_))));

    let payment = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Order,
            order_id: Some(created.order.id),
            reservation_id: None,
            amount: None,
            method: PaymentMethod::Card,
        },
    )
    .await?
    .data
    .expect("payment");
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 4500);
    assert_eq!(payment.order_id, Some(created.order.id));
    assert_eq!(payment.reservation_id, None);

    let duplicate = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Order,
            order_id: Some(created.order.id),
            reservation_id: None,
            amount: None,
            method: PaymentMethod::Cash,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let processed = payment_service::process_payment(&state, &customer, payment.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(processed.status, PaymentStatus::Completed);
    assert!(processed.transaction_ref.is_some());
    assert!(processed.processed_at.is_some());

    let again = payment_service::process_payment(&state, &customer, payment.id).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    // Customers may only cancel.
    let forbidden = order_service::update_order_status(
        &state,
        &customer,
        created.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Confirmed,
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
    ] {
        let order = order_service::update_order_status(
            &state,
            &partner,
            created.order.id,
            UpdateOrderStatusRequest { status: next },
        )
        .await?
        .data
        .expect("order");
        assert_eq!(order.status, next);
    }

    let backwards = order_service::update_order_status(
        &state,
        &partner,
        created.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Pending,
        },
    )
    .await;
    assert!(matches!(backwards, Err(AppError::BadRequest(_))));

    let refunded = payment_service::refund_payment(
        &state,
        &partner,
        payment.id,
        RefundPaymentRequest {
            reason: Some("cold food".into()),
        },
    )
    .await?
    .data
    .expect("payment");
    assert_eq!(refunded.status, PaymentStatus::Refunded);
    assert!(refunded.refunded_at.is_some());

    Ok(())
}

#[tokio::test]
async fn payment_fails_when_order_is_cancelled_before_processing() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;
    let soup = common::create_menu_item(&state, &partner, restaurant.id, "Soup", 800).await?;

    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            restaurant_id: restaurant.id,
            delivery_address: None,
            notes: None,
            items: vec![OrderLineRequest {
                menu_item_id: soup.id,
                quantity: 1,
            }],
        },
    )
    .await?
    .data
    .expect("order")
    .order;

    let payment = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Order,
            order_id: Some(order.id),
            reservation_id: None,
            amount: Some(800),
            method: PaymentMethod::Wallet,
        },
    )
    .await?
    .data
    .expect("payment");

    order_service::update_order_status(
        &state,
        &customer,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Cancelled,
        },
    )
    .await?;

    let processed = payment_service::process_payment(&state, &customer, payment.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(processed.status, PaymentStatus::Failed);
    assert!(processed.failure_reason.is_some());
    assert!(processed.transaction_ref.is_none());

    let refund = payment_service::refund_payment(
        &state,
        &customer,
        payment.id,
        RefundPaymentRequest::default(),
    )
    .await;
    assert!(matches!(refund, Err(AppError::BadRequest(_))));

    let retry = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Order,
            order_id: Some(order.id),
            reservation_id: None,
            amount: None,
            method: PaymentMethod::Wallet,
        },
    )
    .await;
    assert!(matches!(retry, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn items_are_frozen_while_a_payment_holds_the_order() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;
    let bun = common::create_menu_item(&state, &partner, restaurant.id, "Bun", 800).await?;

    let created = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            restaurant_id: restaurant.id,
            delivery_address: None,
            notes: None,
            items: vec![OrderLineRequest {
                menu_item_id: bun.id,
                quantity: 1,
            }],
        },
    )
    .await?
    .data
    .expect("order");
    let order_id = created.order.id;
    let line_id = created.items[0].id;

    let payment = payment_service::create_payment(
        &state,
        &customer,
        CreatePaymentRequest {
            payment_type: PaymentType::Order,
            order_id: Some(order_id),
            reservation_id: None,
            amount: None,
            method: PaymentMethod::Card,
        },
    )
    .await?
    .data
    .expect("payment");

    let while_pending = order_service::add_order_item(
        &state,
        &customer,
        order_id,
        OrderLineRequest {
            menu_item_id: bun.id,
            quantity: 4,
        },
    )
    .await;
    assert!(matches!(while_pending, Err(AppError::BadRequest(_))));

    payment_service::process_payment(&state, &customer, payment.id).await?;

    let after_paid = order_service::add_order_item(
        &state,
        &customer,
        order_id,
        OrderLineRequest {
            menu_item_id: bun.id,
            quantity: 4,
        },
    )
    .await;
    assert!(matches!(after_paid, Err(AppError::BadRequest(_))));

    let remove_after_paid =
        order_service::remove_order_item(&state, &customer, order_id, line_id).await;
    assert!(matches!(remove_after_paid, Err(AppError::BadRequest(_))));

    let order = order_service::get_order(&state, &customer, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.order.total_amount, 800);
    assert_eq!(order.items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn concurrent_payment_attempts_leave_one_active_payment() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;
    let dumpling =
        common::create_menu_item(&state, &partner, restaurant.id, "Dumplings", 600).await?;

    for _ in 0..10 {
        let order = order_service::create_order(
            &state,
            &customer,
            CreateOrderRequest {
                restaurant_id: restaurant.id,
                delivery_address: None,
                notes: None,
                items: vec![OrderLineRequest {
                    menu_item_id: dumpling.id,
                    quantity: 2,
                }],
            },
        )
        .await?
        .data
        .expect("order")
        .order;

        let request = || CreatePaymentRequest {
            payment_type: PaymentType::Order,
            order_id: Some(order.id),
            reservation_id: None,
            amount: None,
            method: PaymentMethod::Card,
        };
        let (first, second) = tokio::join!(
            payment_service::create_payment(&state, &customer, request()),
            payment_service::create_payment(&state, &customer, request()),
        );

        let succeeded = [first.is_ok(), second.is_ok()]
            .into_iter()
            .filter(|ok| *ok)
            .count();
        assert_eq!(succeeded, 1, "order {} got {succeeded} payments", order.id);
        for result in [first, second] {
            if let Err(err) = result {
                assert!(matches!(err, AppError::BadRequest(_)), "unexpected {err:?}");
            }
        }
    }

    Ok(())
}

#[tokio::test]
async fn partner_lists_are_scoped_to_owned_restaurants() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let rival = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;
    let rival_restaurant = common::create_restaurant(&state, &rival).await?;
    let noodles =
        common::create_menu_item(&state, &partner, restaurant.id, "Noodles", 900).await?;
    let pie = common::create_menu_item(&state, &rival, rival_restaurant.id, "Pie", 400).await?;

    let mut order_ids = Vec::new();
    for (restaurant_id, menu_item_id) in [(restaurant.id, noodles.id), (rival_restaurant.id, pie.id)]
    {
        let order = order_service::create_order(
            &state,
            &customer,
            CreateOrderRequest {
                restaurant_id,
                delivery_address: None,
                notes: None,
                items: vec![OrderLineRequest {
                    menu_item_id,
                    quantity: 1,
                }],
            },
        )
        .await?
        .data
        .expect("order")
        .order;
        payment_service::create_payment(
            &state,
            &customer,
            CreatePaymentRequest {
                payment_type: PaymentType::Order,
                order_id: Some(order.id),
                reservation_id: None,
                amount: None,
                method: PaymentMethod::Cash,
            },
        )
        .await?;
        order_ids.push(order.id);
    }
    let (own_order, rival_order) = (order_ids[0], order_ids[1]);

    let orders = order_service::list_orders(&state, &partner, OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    assert!(orders.items.iter().any(|o| o.id == own_order));
    assert!(orders.items.iter().all(|o| o.restaurant_id == restaurant.id));

    let foreign = order_service::list_orders(
        &state,
        &partner,
        OrderListQuery {
            restaurant_id: Some(rival_restaurant.id),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let payments = payment_service::list_payments(&state, &partner, PaymentListQuery::default())
        .await?
        .data
        .expect("payments");
    assert!(payments.items.iter().any(|p| p.order_id == Some(own_order)));
    assert!(payments.items.iter().all(|p| p.order_id != Some(rival_order)));

    let customer_payments =
        payment_service::list_payments(&state, &customer, PaymentListQuery::default())
            .await?
            .data
            .expect("payments");
    assert!(customer_payments.items.iter().all(|p| p.user_id == customer.user_id));

    Ok(())
}

#[tokio::test]
async fn cancelled_order_freezes_items_and_other_customers_see_nothing() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let partner = common::create_user(&state, UserRole::Partner).await?;
    let customer = common::create_user(&state, UserRole::Customer).await?;
    let stranger = common::create_user(&state, UserRole::Customer).await?;
    let restaurant = common::create_restaurant(&state, &partner).await?;
    let tea = common::create_menu_item(&state, &partner, restaurant.id, "Tea", 250).await?;

    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            restaurant_id: restaurant.id,
            delivery_address: None,
            notes: None,
            items: Vec::new(),
        },
    )
    .await?
    .data
    .expect("order")
    .order;
    assert_eq!(order.total_amount, 0);

    let hidden = order_service::get_order(&state, &stranger, order.id).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));

    let cancelled = order_service::update_order_status(
        &state,
        &customer,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Cancelled,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let frozen = order_service::add_order_item(
        &state,
        &customer,
        order.id,
        OrderLineRequest {
            menu_item_id: tea.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(frozen, Err(AppError::BadRequest(_))));

    Ok(())
}
