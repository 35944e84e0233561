//! Redemption analytics: page through every redemption, then aggregate.

use chrono::{Days, NaiveDate};
use dealdesk_core::analytics::{CouponPerformance, DailyCount, daily_redemptions, top_coupons};
use dealdesk_core::{CollectionState, QueryKey, Redemption};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::collection::PageSource;
use crate::error::ApiError;

/// Upper bound on pages read for one report.
pub const MAX_PAGES: usize = 50;

/// Coupons listed in the top-coupons table.
pub const TOP_COUPONS: usize = 5;

/// Every record of a collection, read page by page.
#[derive(Debug, Clone)]
pub struct LoadedRecords<R> {
    pub records: Vec<R>,
    /// `true` if the page cap was hit before the collection ran out.
    pub truncated: bool,
}

/// Read `key` from offset 0 until a short page, at most `max_pages` pages.
///
/// # Errors
///
/// Returns the first failed page request.
pub async fn load_all<S: PageSource>(
    source: &S,
    key: QueryKey,
    page_size: usize,
    max_pages: usize,
) -> Result<LoadedRecords<S::Record>, ApiError> {
    let mut state = CollectionState::new(key, page_size);
    let mut ticket = state.begin_initial();

    while let Some(current) = ticket {
        if state.pages_loaded() >= max_pages {
            break;
        }
        let page = source
            .fetch_page(current.key(), current.offset(), current.limit())
            .await?;
        state.complete(&current, page);
        ticket = state.begin_next();
    }

    Ok(LoadedRecords {
        records: state.records().cloned().collect(),
        truncated: !state.is_exhausted(),
    })
}

/// Redemption activity for a date range.
#[derive(Debug, Clone, Serialize)]
pub struct RedemptionReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub daily: Vec<DailyCount>,
    pub top: Vec<CouponPerformance>,
    pub total_redeemed: u32,
    pub truncated: bool,
}

/// Build a report for the `days` days ending at `today` (inclusive).
///
/// # Errors
///
/// Returns the first failed page request.
#[instrument(skip(source))]
pub async fn redemption_report<S>(
    source: &S,
    page_size: usize,
    today: NaiveDate,
    days: u32,
) -> Result<RedemptionReport, ApiError>
where
    S: PageSource<Record = Redemption>,
{
    let from = today
        .checked_sub_days(Days::new(u64::from(days.max(1) - 1)))
        .unwrap_or(NaiveDate::MIN);

    let loaded = load_all(source, QueryKey::new("redemptions", ""), page_size, MAX_PAGES).await?;
    if loaded.truncated {
        warn!(
            records = loaded.records.len(),
            "Redemption history exceeds the page cap; report is partial"
        );
    }

    let daily = daily_redemptions(&loaded.records, from, today);
    let total_redeemed = daily.iter().map(|d| d.count).sum();
    info!(total_redeemed, "Built redemption report");

    Ok(RedemptionReport {
        from,
        to: today,
        daily,
        top: top_coupons(&loaded.records, TOP_COUPONS),
        total_redeemed,
        truncated: loaded.truncated,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use dealdesk_core::{CouponId, RedemptionCode, RedemptionId, RedemptionStatus};

    use super::*;

    struct VecSource {
        records: Vec<Redemption>,
        offsets: Mutex<Vec<usize>>,
    }

    impl PageSource for VecSource {
        type Record = Redemption;

        async fn fetch_page(
            &self,
            _key: &QueryKey,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<Redemption>, ApiError> {
            self.offsets.lock().unwrap().push(offset);
            Ok(self.records.iter().skip(offset).take(limit).cloned().collect())
        }
    }

    fn redeemed(n: usize, coupon: &str, day: u32) -> Redemption {
        Redemption {
            id: RedemptionId::new(format!("r_{n}")),
            coupon_id: CouponId::new(coupon),
            coupon_title: coupon.to_uppercase(),
            code: RedemptionCode::parse(&format!("CODE{n}")).unwrap(),
            customer_email: None,
            status: RedemptionStatus::Redeemed,
            claimed_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            redeemed_at: Some(Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()),
        }
    }

    fn source(records: Vec<Redemption>) -> VecSource {
        VecSource {
            records,
            offsets: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_load_all_pages_until_short() {
        let source = source((0..14).map(|n| redeemed(n, "c1", 2)).collect());
        let loaded = load_all(&source, QueryKey::new("redemptions", ""), 6, MAX_PAGES)
            .await
            .unwrap();

        assert_eq!(loaded.records.len(), 14);
        assert!(!loaded.truncated);
        assert_eq!(*source.offsets.lock().unwrap(), vec![0, 6, 12]);
    }

    #[tokio::test]
    async fn test_load_all_respects_cap() {
        let source = source((0..30).map(|n| redeemed(n, "c1", 2)).collect());
        let loaded = load_all(&source, QueryKey::new("redemptions", ""), 6, 2)
            .await
            .unwrap();

        assert_eq!(loaded.records.len(), 12);
        assert!(loaded.truncated);
    }

    #[tokio::test]
    async fn test_report_window() {
        let mut records: Vec<_> = (0..3).map(|n| redeemed(n, "latte", 10)).collect();
        records.push(redeemed(3, "bagel", 9));
        records.push(redeemed(4, "bagel", 1));
        let source = source(records);

        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let report = redemption_report(&source, 6, today, 7).await.unwrap();

        assert_eq!(report.from, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(report.daily.len(), 7);
        assert_eq!(report.total_redeemed, 4);
        assert_eq!(report.top.first().unwrap().title, "LATTE");
        assert_eq!(report.top.get(1).unwrap().redeemed, 2);
    }
}
