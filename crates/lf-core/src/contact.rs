//! Contact normalization for dialing and portal submission.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::Lead;

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Format a phone number as E.164, assuming a US number when no country code
/// is present.
#[must_use]
pub fn to_e164(phone: &str) -> String {
    let d = digits(phone);
    if d.len() == 10 {
        format!("+1{d}")
    } else if d.len() == 11 && d.starts_with('1') {
        format!("+{d}")
    } else if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("+1{d}")
    }
}

/// `(555) 123-4567` for ten-digit numbers, otherwise unchanged.
#[must_use]
pub fn to_display_phone(phone: &str) -> String {
    let d = digits(phone);
    if d.len() == 10 {
        format!("({}) {}-{}", &d[..3], &d[3..6], &d[6..])
    } else {
        phone.to_string()
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A lead's data normalized for submission to the enrollment portal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PortalSubmission {
    pub lead_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub area_of_interest: String,
    pub tcpa_opt_in: bool,
}

impl PortalSubmission {
    /// Build a submission, preferring voice-confirmed values.
    #[must_use]
    pub fn from_lead(lead: &Lead) -> Self {
        let trimmed = |v: Option<&str>| v.unwrap_or_default().trim().to_string();
        Self {
            lead_id: lead.id,
            first_name: title_case(&trimmed(lead.first_name.as_deref())),
            last_name: title_case(&trimmed(lead.last_name.as_deref())),
            email: trimmed(lead.effective_email()).to_lowercase(),
            phone: to_display_phone(lead.effective_phone()),
            address: title_case(&trimmed(
                lead.confirmed_address.as_deref().or(lead.address.as_deref()),
            )),
            city: title_case(&trimmed(lead.city.as_deref())),
            state: trimmed(lead.state.as_deref()).to_uppercase(),
            zip_code: trimmed(lead.zip.as_deref()),
            area_of_interest: trimmed(lead.area_of_interest.as_deref()),
            tcpa_opt_in: lead.tcpa_opt_in,
        }
    }

    /// Fatal problems that would make the portal reject the lead.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
        ] {
            if value.is_empty() {
                errors.push(format!("Missing required field: {field}"));
            }
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            errors.push("Invalid email format".to_string());
        }
        if !self.tcpa_opt_in {
            errors.push("TCPA consent not provided".to_string());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn e164_formats() {
        assert_eq!(to_e164("555-123-4567"), "+15551234567");
        assert_eq!(to_e164("1 (555) 123-4567"), "+15551234567");
        assert_eq!(to_e164("+44 20 7946 0958"), "+44 20 7946 0958");
        assert_eq!(to_e164("12345"), "+112345");
    }

    #[test]
    fn display_phone() {
        assert_eq!(to_display_phone("5551234567"), "(555) 123-4567");
        assert_eq!(to_display_phone("12345"), "12345");
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("  jane   DOE "), "Jane Doe");
        assert_eq!(title_case(""), "");
    }
}
