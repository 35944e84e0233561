//! Shop account endpoints (`/shops`).

use dealdesk_core::{Account, RegistrationFields};
use tracing::{info, instrument};

use super::ApiClient;
use super::conversions::convert_account;
use super::types::AccountWire;
use crate::error::ApiError;

impl ApiClient {
    /// The signed-in vendor's shop account.
    ///
    /// `Ok(None)` when the backend has no shop record (404 or a `null`
    /// body). An unapproved shop is still `Some`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account is malformed.
    #[instrument(skip(self))]
    pub async fn my_shop(&self) -> Result<Option<Account>, ApiError> {
        let wire: Option<AccountWire> = self.get_optional(self.endpoint(&["shops", "me"])?).await?;
        Ok(wire.map(convert_account).transpose()?)
    }

    /// Submit shop registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration.
    #[instrument(skip(self, fields), fields(shop_name = %fields.shop_name))]
    pub async fn register_shop(&self, fields: &RegistrationFields) -> Result<Account, ApiError> {
        let wire: AccountWire = self.post(self.endpoint(&["shops"])?, fields).await?;
        let account = convert_account(wire)?;
        info!(shop_id = %account.shop_id, "Shop registered");
        Ok(account)
    }
}
