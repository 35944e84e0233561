//! `dealdesk analytics`: redemption counts per day and the top coupons.

use std::io::Write;

use chrono::Utc;
use dealdesk_client::AppState;

use super::CommandError;

const BAR_WIDTH: u32 = 40;

/// Print the report for the last `days` days.
pub async fn run(state: &AppState, days: u32) -> Result<(), CommandError> {
    let today = Utc::now().date_naive();
    let report = state.redemption_report(today, days).await?;
    let peak = report.daily.iter().map(|d| d.count).max().unwrap_or(0).max(1);

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "Redemptions {} to {}: {}",
        report.from, report.to, report.total_redeemed
    )?;
    for day in &report.daily {
        let bar = "#".repeat((day.count * BAR_WIDTH / peak) as usize);
        writeln!(out, "{}  {:>4}  {bar}", day.date, day.count)?;
    }

    if !report.top.is_empty() {
        writeln!(out)?;
        writeln!(out, "Top coupons")?;
        for (rank, coupon) in report.top.iter().enumerate() {
            writeln!(out, "{:>2}. {:<32} {}", rank + 1, coupon.title, coupon.redeemed)?;
        }
    }

    if report.truncated {
        writeln!(out, "(history truncated; older redemptions not included)")?;
    }
    Ok(())
}
