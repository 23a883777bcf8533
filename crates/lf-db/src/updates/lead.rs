//! Lead update builder.
//!
//! Only contact fields and notes are writable here; status changes go through
//! the lifecycle operations in [`crate::repos::lifecycle`].

use serde::{Deserialize, Deserializer, Serialize};

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeadUpdate {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub address2: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub zip: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl LeadUpdate {
    /// Nullable text columns paired with their requested values.
    pub(crate) fn nullable_columns(&self) -> [(&'static str, Option<&Option<String>>); 9] {
        [
            ("first_name", self.first_name.as_ref()),
            ("last_name", self.last_name.as_ref()),
            ("email", self.email.as_ref()),
            ("address", self.address.as_ref()),
            ("address2", self.address2.as_ref()),
            ("city", self.city.as_ref()),
            ("state", self.state.as_ref()),
            ("zip", self.zip.as_ref()),
            ("notes", self.notes.as_ref()),
        ]
    }
}

pub struct LeadUpdateBuilder(LeadUpdate);

impl Default for LeadUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(LeadUpdate::default())
    }

    #[must_use]
    pub fn first_name(mut self, first_name: Option<String>) -> Self {
        self.0.first_name = Some(first_name);
        self
    }

    #[must_use]
    pub fn last_name(mut self, last_name: Option<String>) -> Self {
        self.0.last_name = Some(last_name);
        self
    }

    #[must_use]
    pub fn email(mut self, email: Option<String>) -> Self {
        self.0.email = Some(email);
        self
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.0.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: Option<String>) -> Self {
        self.0.address = Some(address);
        self
    }

    #[must_use]
    pub fn city(mut self, city: Option<String>) -> Self {
        self.0.city = Some(city);
        self
    }

    #[must_use]
    pub fn state(mut self, state: Option<String>) -> Self {
        self.0.state = Some(state);
        self
    }

    #[must_use]
    pub fn zip(mut self, zip: Option<String>) -> Self {
        self.0.zip = Some(zip);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.0.notes = Some(notes);
        self
    }

    #[must_use]
    pub fn build(self) -> LeadUpdate {
        self.0
    }
}
