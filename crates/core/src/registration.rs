//! Multi-step shop registration draft.
//!
//! The draft walks `ShopDetails → Contact → Location → Review`. Advancing
//! only validates the fields of the current step; going back never clears
//! anything. [`RegistrationDraft::finish`] re-validates every step and
//! produces the payload sent to the account service.

use serde::{Deserialize, Serialize};

use crate::types::Email;

/// A step of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    #[default]
    ShopDetails,
    Contact,
    Location,
    Review,
}

impl RegistrationStep {
    pub const ALL: [Self; 4] = [Self::ShopDetails, Self::Contact, Self::Location, Self::Review];

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::ShopDetails => Some(Self::Contact),
            Self::Contact => Some(Self::Location),
            Self::Location => Some(Self::Review),
            Self::Review => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::ShopDetails => None,
            Self::Contact => Some(Self::ShopDetails),
            Self::Location => Some(Self::Contact),
            Self::Review => Some(Self::Location),
        }
    }

    /// 1-based position, for "step 2 of 4" labels.
    #[must_use]
    pub const fn number(self) -> usize {
        match self {
            Self::ShopDetails => 1,
            Self::Contact => 2,
            Self::Location => 3,
            Self::Review => 4,
        }
    }
}

/// Business category shown on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopCategory {
    Restaurant,
    Cafe,
    Retail,
    Beauty,
    Fitness,
    Entertainment,
    Services,
    Other,
}

impl std::str::FromStr for ShopCategory {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restaurant" => Ok(Self::Restaurant),
            "cafe" => Ok(Self::Cafe),
            "retail" => Ok(Self::Retail),
            "beauty" => Ok(Self::Beauty),
            "fitness" => Ok(Self::Fitness),
            "entertainment" => Ok(Self::Entertainment),
            "services" => Ok(Self::Services),
            "other" => Ok(Self::Other),
            other => Err(RegistrationError::UnknownCategory(other.to_string())),
        }
    }
}

/// Why a step (or the whole draft) cannot be submitted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("invalid contact email: {0}")]
    InvalidEmail(String),
    #[error("invalid phone number")]
    InvalidPhone,
    #[error("unknown shop category: {0}")]
    UnknownCategory(String),
    #[error("registration is already at the review step")]
    AlreadyAtReview,
}

/// Postal address of the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopAddress {
    pub line1: String,
    pub city: String,
    pub country: String,
}

/// The validated registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFields {
    pub shop_name: String,
    pub category: ShopCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub contact_name: String,
    pub contact_email: Email,
    pub phone: String,
    pub address: ShopAddress,
}

/// Form state across the registration steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    step: RegistrationStep,
    pub shop_name: String,
    pub category: Option<ShopCategory>,
    pub description: String,
    pub contact_name: String,
    pub contact_email: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub country: String,
}

const MAX_SHOP_NAME: usize = 80;
const MAX_DESCRIPTION: usize = 500;

fn required(value: &str, field: &'static str) -> Result<String, RegistrationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(RegistrationError::Missing(field))
    } else {
        Ok(value.to_string())
    }
}

fn bounded(value: &str, field: &'static str, max: usize) -> Result<(), RegistrationError> {
    if value.trim().chars().count() > max {
        Err(RegistrationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

fn normalize_phone(phone: &str) -> Result<String, RegistrationError> {
    let phone = required(phone, "phone")?;
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if !allowed || !(7..=15).contains(&digits) {
        return Err(RegistrationError::InvalidPhone);
    }
    Ok(phone)
}

impl RegistrationDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the shop details step. The draft stays on its current step.
    #[must_use]
    pub fn with_shop(
        mut self,
        name: impl Into<String>,
        category: ShopCategory,
        description: impl Into<String>,
    ) -> Self {
        self.shop_name = name.into();
        self.category = Some(category);
        self.description = description.into();
        self
    }

    /// Fill the contact step.
    #[must_use]
    pub fn with_contact(
        mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        self.contact_name = name.into();
        self.contact_email = email.into();
        self.phone = phone.into();
        self
    }

    /// Fill the location step.
    #[must_use]
    pub fn with_location(
        mut self,
        address_line: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.address_line = address_line.into();
        self.city = city.into();
        self.country = country.into();
        self
    }

    #[must_use]
    pub const fn step(&self) -> RegistrationStep {
        self.step
    }

    /// Validate the fields that belong to `step`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field of that step.
    pub fn validate_step(&self, step: RegistrationStep) -> Result<(), RegistrationError> {
        match step {
            RegistrationStep::ShopDetails => {
                required(&self.shop_name, "shop name")?;
                bounded(&self.shop_name, "shop name", MAX_SHOP_NAME)?;
                bounded(&self.description, "description", MAX_DESCRIPTION)?;
                if self.category.is_none() {
                    return Err(RegistrationError::Missing("category"));
                }
            }
            RegistrationStep::Contact => {
                required(&self.contact_name, "contact name")?;
                Email::parse(&self.contact_email)
                    .map_err(|e| RegistrationError::InvalidEmail(e.to_string()))?;
                normalize_phone(&self.phone)?;
            }
            RegistrationStep::Location => {
                required(&self.address_line, "address")?;
                required(&self.city, "city")?;
                required(&self.country, "country")?;
            }
            RegistrationStep::Review => {}
        }
        Ok(())
    }

    /// Validate the current step and move to the next one.
    ///
    /// # Errors
    ///
    /// Returns the validation error and stays on the current step, or
    /// [`RegistrationError::AlreadyAtReview`] at the last step.
    pub fn advance(&mut self) -> Result<RegistrationStep, RegistrationError> {
        let next = self.step.next().ok_or(RegistrationError::AlreadyAtReview)?;
        self.validate_step(self.step)?;
        self.step = next;
        Ok(next)
    }

    /// Go back one step, keeping every field.
    pub const fn back(&mut self) -> RegistrationStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Validate every step and build the payload.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field across all steps.
    pub fn finish(&self) -> Result<RegistrationFields, RegistrationError> {
        for step in RegistrationStep::ALL {
            self.validate_step(step)?;
        }
        let category = self.category.ok_or(RegistrationError::Missing("category"))?;
        let contact_email = Email::parse(&self.contact_email)
            .map_err(|e| RegistrationError::InvalidEmail(e.to_string()))?;
        let description = self.description.trim();

        Ok(RegistrationFields {
            shop_name: required(&self.shop_name, "shop name")?,
            category,
            description: (!description.is_empty()).then(|| description.to_string()),
            contact_name: required(&self.contact_name, "contact name")?,
            contact_email,
            phone: normalize_phone(&self.phone)?,
            address: ShopAddress {
                line1: required(&self.address_line, "address")?,
                city: required(&self.city, "city")?,
                country: required(&self.country, "country")?,
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled() -> RegistrationDraft {
        RegistrationDraft::new()
            .with_shop(" Corner Cafe ", ShopCategory::Cafe, "")
            .with_contact("Sam", "sam@cornercafe.example", "+1 (555) 010-2030")
            .with_location("1 Main St", "Springfield", "US")
    }

    #[test]
    fn test_advance_validates_only_current_step() {
        let mut draft = RegistrationDraft::new();
        draft.shop_name = "Corner Cafe".to_string();
        draft.category = Some(ShopCategory::Cafe);

        assert_eq!(draft.advance(), Ok(RegistrationStep::Contact));
        assert_eq!(
            draft.advance(),
            Err(RegistrationError::Missing("contact name"))
        );
        assert_eq!(draft.step(), RegistrationStep::Contact);
    }

    #[test]
    fn test_filled_draft_starts_at_first_step() {
        let mut draft = filled();
        assert_eq!(draft.step(), RegistrationStep::ShopDetails);
        assert_eq!(draft.advance(), Ok(RegistrationStep::Contact));
        assert_eq!(draft.phone, "+1 (555) 010-2030");
    }

    #[test]
    fn test_back_keeps_input() {
        let mut draft = filled();
        draft.advance().unwrap();
        draft.advance().unwrap();
        assert_eq!(draft.back(), RegistrationStep::Contact);
        assert_eq!(draft.back(), RegistrationStep::ShopDetails);
        assert_eq!(draft.back(), RegistrationStep::ShopDetails);
        assert_eq!(draft.contact_name, "Sam");
    }

    #[test]
    fn test_advance_past_review_fails() {
        let mut draft = filled();
        for _ in 0..3 {
            draft.advance().unwrap();
        }
        assert_eq!(draft.step(), RegistrationStep::Review);
        assert_eq!(draft.advance(), Err(RegistrationError::AlreadyAtReview));
    }

    #[test]
    fn test_finish_builds_trimmed_fields() {
        let fields = filled().finish().unwrap();
        assert_eq!(fields.shop_name, "Corner Cafe");
        assert_eq!(fields.description, None);
        assert_eq!(fields.address.city, "Springfield");

        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["contactEmail"], "sam@cornercafe.example");
        assert_eq!(json["category"], "cafe");
    }

    #[test]
    fn test_finish_revalidates_everything() {
        let mut draft = filled();
        draft.city = String::new();
        assert_eq!(draft.finish(), Err(RegistrationError::Missing("city")));
    }

    #[test]
    fn test_phone_rules() {
        let mut draft = filled();
        draft.phone = "12345".to_string();
        assert_eq!(
            draft.validate_step(RegistrationStep::Contact),
            Err(RegistrationError::InvalidPhone)
        );
        draft.phone = "555-0102-abc".to_string();
        assert_eq!(
            draft.validate_step(RegistrationStep::Contact),
            Err(RegistrationError::InvalidPhone)
        );
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Retail".parse::<ShopCategory>(), Ok(ShopCategory::Retail));
        assert!("bakery".parse::<ShopCategory>().is_err());
    }
}
