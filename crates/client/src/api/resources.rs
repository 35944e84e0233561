//! Generic paged collections (`/{resource}`).

use dealdesk_core::{Coupon, CouponInput, Redemption};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::ApiClient;
use super::conversions::{convert_coupon, convert_redemption};
use super::types::{CouponWire, RedemptionWire};
use crate::error::{ApiError, MalformedResponseError};

/// A collection exposed by the API.
pub trait Resource: Send + Sync + 'static {
    /// Path segment of the collection (also the cache namespace).
    const NAME: &'static str;

    type Record: Clone + Send + Sync + 'static;
    type Wire: DeserializeOwned + Send;

    /// Validate and convert one record.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field.
    fn from_wire(wire: Self::Wire) -> Result<Self::Record, MalformedResponseError>;
}

/// A collection the vendor can write to.
pub trait MutableResource: Resource {
    type Input: Serialize + Sync;
}

/// The shop's coupons.
#[derive(Debug, Clone, Copy)]
pub struct Coupons;

impl Resource for Coupons {
    const NAME: &'static str = "coupons";
    type Record = Coupon;
    type Wire = CouponWire;

    fn from_wire(wire: Self::Wire) -> Result<Self::Record, MalformedResponseError> {
        convert_coupon(wire)
    }
}

impl MutableResource for Coupons {
    type Input = CouponInput;
}

/// Codes claimed against the shop's coupons.
#[derive(Debug, Clone, Copy)]
pub struct Redemptions;

impl Resource for Redemptions {
    const NAME: &'static str = "redemptions";
    type Record = Redemption;
    type Wire = RedemptionWire;

    fn from_wire(wire: Self::Wire) -> Result<Self::Record, MalformedResponseError> {
        convert_redemption(wire)
    }
}

impl ApiClient {
    /// Fetch one page of a collection.
    ///
    /// The page holds at most `limit` records; fewer means the collection
    /// is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the backend returns more than
    /// `limit` records, or any record is malformed.
    #[instrument(skip(self), fields(resource = R::NAME))]
    pub async fn list_page<R: Resource>(
        &self,
        search: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<R::Record>, ApiError> {
        let mut url = self.endpoint(&[R::NAME])?;
        url.query_pairs_mut()
            .append_pair("search", search)
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());

        let page: Vec<R::Wire> = self.get(url).await?;
        if page.len() > limit {
            return Err(MalformedResponseError::new(
                R::NAME,
                "length",
                format!("{} records exceed the page limit of {limit}", page.len()),
            )
            .into());
        }

        let records = page
            .into_iter()
            .map(R::from_wire)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = records.len(), "Fetched page");
        Ok(records)
    }

    /// Fetch a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the record is malformed.
    #[instrument(skip(self), fields(resource = R::NAME))]
    pub async fn get_one<R: Resource>(&self, id: &str) -> Result<R::Record, ApiError> {
        let wire: R::Wire = self.get(self.endpoint(&[R::NAME, id])?).await?;
        Ok(R::from_wire(wire)?)
    }

    /// Create a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the returned record is malformed.
    #[instrument(skip(self, input), fields(resource = R::NAME))]
    pub async fn create<R: MutableResource>(
        &self,
        input: &R::Input,
    ) -> Result<R::Record, ApiError> {
        let wire: R::Wire = self.post(self.endpoint(&[R::NAME])?, input).await?;
        Ok(R::from_wire(wire)?)
    }

    /// Replace the editable fields of a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the returned record is malformed.
    #[instrument(skip(self, input), fields(resource = R::NAME))]
    pub async fn update<R: MutableResource>(
        &self,
        id: &str,
        input: &R::Input,
    ) -> Result<R::Record, ApiError> {
        let wire: R::Wire = self.patch(self.endpoint(&[R::NAME, id])?, input).await?;
        Ok(R::from_wire(wire)?)
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(resource = R::NAME))]
    pub async fn delete_one<R: MutableResource>(&self, id: &str) -> Result<(), ApiError> {
        self.delete(self.endpoint(&[R::NAME, id])?).await
    }
}
