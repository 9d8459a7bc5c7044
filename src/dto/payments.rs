use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{PaymentMethod, PaymentType},
    models::Payment,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub payment_type: PaymentType,
    pub order_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    /// Required for reservation deposits. Order payments default to the order total.
    pub amount: Option<i64>,
    pub method: PaymentMethod,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefundPaymentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
}
