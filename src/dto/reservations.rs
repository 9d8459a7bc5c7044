use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{domain::ReservationStatus, models::Reservation};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub restaurant_id: Uuid,
    pub reserved_for: DateTime<Utc>,
    pub party_size: i32,
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReservationStatusRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationList {
    pub items: Vec<Reservation>,
}
