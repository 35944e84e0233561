//! `dealdesk coupons`: list, create and delete coupons.

use std::io::Write;

use dealdesk_client::{AppState, FetchOutcome};
use dealdesk_core::{Coupon, CouponId, CouponInput, CurrencyCode, DiscountValue, Price};
use rust_decimal::Decimal;

use super::CommandError;

/// Build a discount from the `--percent` / `--amount` flags.
pub fn discount(
    percent: Option<Decimal>,
    amount: Option<Decimal>,
    currency: &str,
) -> Result<DiscountValue, CommandError> {
    match (percent, amount) {
        (Some(percent), None) => Ok(DiscountValue::Percentage { percent }),
        (None, Some(amount)) => {
            let currency: CurrencyCode = currency.parse().map_err(CommandError::Argument)?;
            Ok(DiscountValue::FixedAmount {
                amount: Price::new(amount, currency),
            })
        }
        _ => Err(CommandError::Argument(
            "pass exactly one of --percent or --amount".to_string(),
        )),
    }
}

/// Print up to `pages` pages of coupons matching `search`.
pub async fn list(state: &AppState, search: &str, pages: usize) -> Result<(), CommandError> {
    let viewer = state.coupon_viewer(search);
    viewer.fetch_initial().await?;
    for _ in 1..pages {
        if viewer.fetch_next().await? == FetchOutcome::Skipped {
            break;
        }
    }

    let snapshot = viewer.snapshot().await;
    let mut out = std::io::stdout().lock();
    for coupon in &snapshot.records {
        write_coupon(&mut out, coupon)?;
    }
    writeln!(
        out,
        "{} coupons in {} pages{}",
        snapshot.records.len(),
        snapshot.pages_loaded,
        if snapshot.exhausted { "" } else { " (more available)" }
    )?;
    Ok(())
}

/// Create a draft coupon.
pub async fn create(
    state: &AppState,
    title: String,
    description: Option<String>,
    discount: DiscountValue,
    quantity: Option<u32>,
) -> Result<(), CommandError> {
    let mut input = CouponInput::new(title, discount);
    input.description = description;
    input.quantity = quantity;

    let coupon = state.coupons().create(&input).await?;
    write_coupon(&mut std::io::stdout().lock(), &coupon)?;
    Ok(())
}

/// Delete a coupon by ID.
pub async fn delete(state: &AppState, id: &str) -> Result<(), CommandError> {
    state.coupons().delete(&CouponId::new(id)).await?;
    writeln!(std::io::stdout().lock(), "Deleted {id}")?;
    Ok(())
}

fn write_coupon(out: &mut impl Write, coupon: &Coupon) -> std::io::Result<()> {
    let remaining = coupon
        .remaining()
        .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
    writeln!(
        out,
        "{:<14} {:<32} {:<14} {:<8} {} redeemed, {} left",
        coupon.id, coupon.title, coupon.discount, coupon.status, coupon.redeemed_count, remaining
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_flags() {
        assert!(matches!(
            discount(Some(Decimal::from(20)), None, "USD").unwrap(),
            DiscountValue::Percentage { .. }
        ));
        assert!(matches!(
            discount(None, Some(Decimal::from(5)), "eur").unwrap(),
            DiscountValue::FixedAmount {
                amount: Price {
                    currency_code: CurrencyCode::EUR,
                    ..
                }
            }
        ));
        assert!(discount(None, Some(Decimal::from(5)), "XYZ").is_err());
        assert!(discount(None, None, "USD").is_err());
    }
}
