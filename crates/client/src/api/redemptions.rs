//! Code lookup endpoints (`/redemptions/validate`, `/redemptions/{id}/confirm`).

use dealdesk_core::{Redemption, RedemptionCode, RedemptionId};
use tracing::{info, instrument};

use super::ApiClient;
use super::conversions::convert_redemption;
use super::types::RedemptionWire;
use crate::error::{ApiError, LookupError, NotFoundError};

impl ApiClient {
    /// Look up the redemption behind a code.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when the backend does not know the
    /// code, or the underlying API error.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn validate_code(&self, code: &RedemptionCode) -> Result<Redemption, LookupError> {
        let url = self.endpoint(&["redemptions", "validate", code.as_str()])?;
        let Some(wire) = self.get_optional::<RedemptionWire>(url).await? else {
            return Err(NotFoundError {
                code: code.to_string(),
            }
            .into());
        };
        Ok(convert_redemption(wire).map_err(ApiError::from)?)
    }

    /// Mark a claimed redemption as used.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the confirmation.
    #[instrument(skip(self), fields(redemption_id = %id))]
    pub async fn confirm_redemption(&self, id: &RedemptionId) -> Result<Redemption, ApiError> {
        let url = self.endpoint(&["redemptions", id.as_str(), "confirm"])?;
        let wire: RedemptionWire = self.post(url, &serde_json::json!({})).await?;
        let redemption = convert_redemption(wire)?;
        info!(status = %redemption.status, "Redemption confirmed");
        Ok(redemption)
    }
}
