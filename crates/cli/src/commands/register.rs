//! `dealdesk register`: walk the registration steps and submit.

use std::io::Write;

use clap::Args;
use dealdesk_client::{AppError, AppState};
use dealdesk_core::{AccessState, RegistrationDraft, RegistrationStep, ShopCategory};

use super::CommandError;

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Shop name
    #[arg(long)]
    pub name: String,

    /// Shop category (restaurant, cafe, retail, beauty, fitness, entertainment, services, other)
    #[arg(long)]
    pub category: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub contact_name: String,

    #[arg(long)]
    pub contact_email: String,

    #[arg(long)]
    pub phone: String,

    /// Street address
    #[arg(long)]
    pub address: String,

    #[arg(long)]
    pub city: String,

    #[arg(long)]
    pub country: String,
}

impl RegisterArgs {
    fn into_draft(self) -> Result<RegistrationDraft, AppError> {
        let category: ShopCategory = self.category.parse()?;
        Ok(RegistrationDraft::new()
            .with_shop(self.name, category, self.description)
            .with_contact(self.contact_name, self.contact_email, self.phone)
            .with_location(self.address, self.city, self.country))
    }
}

/// Validate step by step, then submit through the access guard.
pub async fn run(
    state: &AppState,
    access: AccessState,
    args: RegisterArgs,
) -> Result<(), CommandError> {
    if access != AccessState::RegistrationRequired {
        return Err(CommandError::Gate(access));
    }

    let mut draft = args.into_draft()?;
    while draft.step() != RegistrationStep::Review {
        draft.advance().map_err(AppError::from)?;
    }
    let fields = draft.finish().map_err(AppError::from)?;

    let account = state.guard().submit_registration(&fields).await?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "Registered {} ({})", account.shop_name, account.shop_id)?;
    writeln!(out, "Access: {}", state.guard().current())?;
    Ok(())
}
