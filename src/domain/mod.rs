//! Marketplace rules that hold independently of storage: the role and status
//! vocabularies, the lifecycle transition tables, order total bookkeeping and
//! the payment target rule.

pub mod payment;
pub mod status;
pub mod totals;

pub use payment::{PaymentTarget, Settlement};
pub use status::{
    OrderStatus, PaymentMethod, PaymentStatus, PaymentType, ReservationStatus, UserRole,
};
pub use totals::{line_total, order_total};
