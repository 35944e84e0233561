//! Session endpoints (`/auth/*`).

use dealdesk_core::{Email, UserIdentity};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use super::ApiClient;
use super::conversions::convert_identity;
use super::types::{IdentityWire, SignInRequest};
use crate::error::{ApiError, AuthError, MalformedResponseError};

impl ApiClient {
    /// Exchange credentials for a session token.
    ///
    /// The token is kept on the client for every later request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on 401/403, or the
    /// underlying API error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<UserIdentity, AuthError> {
        let request = SignInRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        };

        let wire: IdentityWire = self
            .post(self.endpoint(&["auth", "sign-in"])?, &request)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(_) => AuthError::InvalidCredentials,
                other => AuthError::Api(other),
            })?;

        let token = wire
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::from(MalformedResponseError::new("identity", "token", "is missing"))
            })?;
        let identity = convert_identity(wire).map_err(ApiError::from)?;

        self.set_token(Some(SecretString::from(token))).await;
        info!(uid = %identity.uid, "Signed in");
        Ok(identity)
    }

    /// End the session on the backend and drop the local token.
    ///
    /// # Errors
    ///
    /// Returns the API error; the local token is kept in that case.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.post_empty(self.endpoint(&["auth", "sign-out"])?).await?;
        self.set_token(None).await;
        info!("Signed out");
        Ok(())
    }

    /// The identity behind the current token, if any.
    ///
    /// A missing or rejected token resolves to `None`.
    ///
    /// # Errors
    ///
    /// Returns transport and server errors.
    #[instrument(skip(self))]
    pub async fn current_identity(&self) -> Result<Option<UserIdentity>, AuthError> {
        if !self.has_token().await {
            return Ok(None);
        }
        match self.get_optional::<IdentityWire>(self.endpoint(&["auth", "me"])?).await {
            Ok(Some(wire)) => Ok(Some(convert_identity(wire).map_err(ApiError::from)?)),
            Ok(None) | Err(ApiError::Unauthorized(_)) => {
                self.set_token(None).await;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
