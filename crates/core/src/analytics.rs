//! Redemption analytics series.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::records::Redemption;
use crate::types::{CouponId, RedemptionStatus};

/// Redemptions on one calendar day (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// Daily redeemed counts for every day in `from..=to`, zero-filled.
///
/// Only redemptions with status `Redeemed` and a `redeemed_at` inside the
/// range are counted. An inverted range yields an empty series.
#[must_use]
pub fn daily_redemptions(
    redemptions: &[Redemption],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DailyCount> {
    if to < from {
        return Vec::new();
    }

    let mut counts: BTreeMap<NaiveDate, u32> = from
        .iter_days()
        .take_while(|day| *day <= to)
        .map(|day| (day, 0))
        .collect();

    for redemption in redemptions {
        if redemption.status != RedemptionStatus::Redeemed {
            continue;
        }
        let Some(at) = redemption.redeemed_at else {
            continue;
        };
        if let Some(count) = counts.get_mut(&at.date_naive()) {
            *count += 1;
        }
    }

    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Redeemed count for a single coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponPerformance {
    pub coupon_id: CouponId,
    pub title: String,
    pub redeemed: u32,
}

/// The `limit` coupons with the most redeemed codes, best first.
///
/// Ties are broken by title so the order is stable.
#[must_use]
pub fn top_coupons(redemptions: &[Redemption], limit: usize) -> Vec<CouponPerformance> {
    let mut by_coupon: HashMap<&CouponId, CouponPerformance> = HashMap::new();
    for redemption in redemptions
        .iter()
        .filter(|r| r.status == RedemptionStatus::Redeemed)
    {
        by_coupon
            .entry(&redemption.coupon_id)
            .or_insert_with(|| CouponPerformance {
                coupon_id: redemption.coupon_id.clone(),
                title: redemption.coupon_title.clone(),
                redeemed: 0,
            })
            .redeemed += 1;
    }

    let mut ranked: Vec<_> = by_coupon.into_values().collect();
    ranked.sort_by(|a, b| b.redeemed.cmp(&a.redeemed).then_with(|| a.title.cmp(&b.title)));
    ranked.truncate(limit);
    ranked
}
