//! `dealdesk redeem`: look a code up at the counter.

use std::io::Write;

use dealdesk_client::{AppError, AppState};
use dealdesk_core::Redemption;

use super::CommandError;

/// Look up `code` (or decode `scan`), print it, and confirm if asked.
pub async fn run(
    state: &AppState,
    code: Option<String>,
    scan: Option<String>,
    confirm: bool,
) -> Result<(), CommandError> {
    let mut flow = state.redeem_flow();

    let redemption = if let Some(payload) = scan {
        match flow.submit_scan(&payload).await {
            Some(result) => result?,
            None => {
                return Err(CommandError::Argument(
                    "scan payload does not contain a code".to_string(),
                ));
            }
        }
    } else {
        flow.set_input(code.unwrap_or_default());
        flow.submit().await?
    };

    let mut out = std::io::stdout().lock();
    write_redemption(&mut out, &redemption)?;

    if confirm {
        match flow.confirm().await {
            Ok(confirmed) => write_redemption(&mut out, &confirmed)?,
            Err(AppError::Conflict(message)) => writeln!(out, "{message}")?,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn write_redemption(out: &mut impl Write, redemption: &Redemption) -> std::io::Result<()> {
    writeln!(out, "Code:     {}", redemption.code)?;
    writeln!(out, "Coupon:   {}", redemption.coupon_title)?;
    writeln!(out, "Status:   {}", redemption.status)?;
    if let Some(email) = &redemption.customer_email {
        writeln!(out, "Customer: {email}")?;
    }
    writeln!(out, "Claimed:  {}", redemption.claimed_at.format("%Y-%m-%d %H:%M"))?;
    if let Some(at) = redemption.redeemed_at {
        writeln!(out, "Redeemed: {}", at.format("%Y-%m-%d %H:%M"))?;
    }
    Ok(())
}
