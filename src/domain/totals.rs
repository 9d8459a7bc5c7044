use crate::error::{AppError, AppResult};

/// Price of a single order line, in minor currency units.
pub fn line_total(unit_price: i64, quantity: i32) -> AppResult<i64> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }
    if unit_price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::BadRequest("line total overflows".into()))
}

/// Sum of the line totals of an order. An order without lines totals 0.
pub fn order_total<I>(line_totals: I) -> AppResult<i64>
where
    I: IntoIterator<Item = i64>,
{
    line_totals
        .into_iter()
        .try_fold(0_i64, |acc, line| acc.checked_add(line))
        .ok_or_else(|| AppError::BadRequest("order total overflows".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_price_by_quantity() {
        assert_eq!(line_total(1_250, 3).unwrap(), 3_750);
        assert_eq!(line_total(0, 2).unwrap(), 0);
    }

    #[test]
    fn line_total_rejects_bad_input() {
        assert!(line_total(100, 0).is_err());
        assert!(line_total(100, -1).is_err());
        assert!(line_total(-5, 1).is_err());
        assert!(line_total(i64::MAX, 2).is_err());
    }

    #[test]
    fn order_total_sums_lines() {
        assert_eq!(order_total(Vec::new()).unwrap(), 0);
        assert_eq!(order_total([3_750, 1_000, 250]).unwrap(), 5_000);
    }

    #[test]
    fn order_total_detects_overflow() {
        assert!(order_total([i64::MAX, 1]).is_err());
    }
}
