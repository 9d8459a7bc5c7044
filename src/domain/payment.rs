use uuid::Uuid;

use crate::domain::{OrderStatus, PaymentType, ReservationStatus};
use crate::error::{AppError, AppResult};

/// The single record a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    Order(Uuid),
    Reservation(Uuid),
}

impl PaymentTarget {
    /// Accepts exactly the reference matching `payment_type` and nothing else.
    pub fn resolve(
        payment_type: PaymentType,
        order_id: Option<Uuid>,
        reservation_id: Option<Uuid>,
    ) -> AppResult<Self> {
        match (payment_type, order_id, reservation_id) {
            (PaymentType::Order, Some(id), None) => Ok(PaymentTarget::Order(id)),
            (PaymentType::Reservation, None, Some(id)) => Ok(PaymentTarget::Reservation(id)),
            (PaymentType::Order, _, _) => Err(AppError::BadRequest(
                "order payments require order_id and no reservation_id".into(),
            )),
            (PaymentType::Reservation, _, _) => Err(AppError::BadRequest(
                "reservation payments require reservation_id and no order_id".into(),
            )),
        }
    }

    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentTarget::Order(_) => PaymentType::Order,
            PaymentTarget::Reservation(_) => PaymentType::Reservation,
        }
    }

    pub fn order_id(&self) -> Option<Uuid> {
        match self {
            PaymentTarget::Order(id) => Some(*id),
            PaymentTarget::Reservation(_) => None,
        }
    }

    pub fn reservation_id(&self) -> Option<Uuid> {
        match self {
            PaymentTarget::Reservation(id) => Some(*id),
            PaymentTarget::Order(_) => None,
        }
    }
}

/// Outcome of settling a payment that has entered `processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Completed,
    Failed(String),
}

/// An order payment settles only while the order is live and still costs
/// exactly what the payment was created for.
pub fn settle_order_payment(amount: i64, status: OrderStatus, total_amount: i64) -> Settlement {
    if status == OrderStatus::Cancelled {
        return Settlement::Failed("order was cancelled".into());
    }
    if amount != total_amount {
        return Settlement::Failed(format!(
            "order total changed from {amount} to {total_amount}"
        ));
    }
    Settlement::Completed
}

pub fn settle_reservation_payment(status: ReservationStatus) -> Settlement {
    match status {
        ReservationStatus::Cancelled => Settlement::Failed("reservation was cancelled".into()),
        _ => Settlement::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_payment_settles_when_amount_matches() {
        assert_eq!(
            settle_order_payment(4_500, OrderStatus::Confirmed, 4_500),
            Settlement::Completed
        );
    }

    #[test]
    fn order_payment_fails_on_cancel_or_drift() {
        assert_eq!(
            settle_order_payment(4_500, OrderStatus::Cancelled, 4_500),
            Settlement::Failed("order was cancelled".into())
        );
        assert_eq!(
            settle_order_payment(4_500, OrderStatus::Pending, 6_000),
            Settlement::Failed("order total changed from 4500 to 6000".into())
        );
    }

    #[test]
    fn reservation_deposit_fails_only_when_cancelled() {
        assert_eq!(
            settle_reservation_payment(ReservationStatus::Pending),
            Settlement::Completed
        );
        assert!(matches!(
            settle_reservation_payment(ReservationStatus::Cancelled),
            Settlement::Failed(_)
        ));
    }

    #[test]
    fn resolves_matching_reference() {
        let id = Uuid::new_v4();
        let target = PaymentTarget::resolve(PaymentType::Order, Some(id), None).unwrap();
        assert_eq!(target, PaymentTarget::Order(id));
        assert_eq!(target.order_id(), Some(id));
        assert_eq!(target.reservation_id(), None);
        assert_eq!(target.payment_type(), PaymentType::Order);

        let target = PaymentTarget::resolve(PaymentType::Reservation, None, Some(id)).unwrap();
        assert_eq!(target.reservation_id(), Some(id));
    }

    #[test]
    fn rejects_missing_or_double_reference() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(PaymentTarget::resolve(PaymentType::Order, None, None).is_err());
        assert!(PaymentTarget::resolve(PaymentType::Order, Some(a), Some(b)).is_err());
        assert!(PaymentTarget::resolve(PaymentType::Order, None, Some(b)).is_err());
        assert!(PaymentTarget::resolve(PaymentType::Reservation, Some(a), None).is_err());
        assert!(PaymentTarget::resolve(PaymentType::Reservation, Some(a), Some(b)).is_err());
    }
}
