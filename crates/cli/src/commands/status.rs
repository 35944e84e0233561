//! `dealdesk status`: who is signed in and what the gate decided.

use std::io::Write;

use dealdesk_client::AppState;
use dealdesk_core::AccessState;

use super::CommandError;

/// Print the session, shop and access state.
pub async fn run(state: &AppState, access: AccessState) -> Result<(), CommandError> {
    let session = state.session().current();
    let account = state.guard().account().await;
    let mut out = std::io::stdout().lock();

    match session.identity() {
        Some(identity) => writeln!(out, "Signed in as {} ({})", identity.email, identity.uid)?,
        None => writeln!(out, "Not signed in")?,
    }

    if let Some(account) = &account {
        writeln!(out, "Shop:         {} ({})", account.shop_name, account.shop_id)?;
        writeln!(
            out,
            "Approved:     {}",
            if account.approved { "yes" } else { "no" }
        )?;
        writeln!(out, "Subscription: {}", account.subscription_state)?;
    }

    writeln!(out, "Access:       {access}")?;
    if let Some(view) = access.substitute_view() {
        writeln!(out, "Next step:    {view}")?;
    }
    Ok(())
}
