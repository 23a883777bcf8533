//! CSV lead import parsing.
//!
//! Turns an uploaded CSV into [`NewLead`] rows plus per-row error messages.
//! Header matching ignores case, spaces and underscores, so `First Name`,
//! `first_name` and `Firstname` all land in `first_name`.

use crate::entities::NewLead;
use crate::errors::CoreError;
use crate::responses::ImportResult;

/// Most row errors reported back before the rest are summarized.
pub const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    Address2,
    City,
    State,
    Zip,
    Notes,
}

fn normalize_header(h: &str) -> String {
    h.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn column_for(header: &str) -> Option<Column> {
    match normalize_header(header).as_str() {
        "firstname" => Some(Column::FirstName),
        "lastname" => Some(Column::LastName),
        "email" => Some(Column::Email),
        "phone" | "phone1" => Some(Column::Phone),
        "address" => Some(Column::Address),
        "address2" => Some(Column::Address2),
        "city" => Some(Column::City),
        "state" => Some(Column::State),
        "zip" | "zipcode" => Some(Column::Zip),
        "notes" => Some(Column::Notes),
        _ => None,
    }
}

/// Leads parsed from one CSV upload.
#[derive(Debug, Default)]
pub struct ParsedImport {
    /// `(row number, lead)`; row numbers are 1-based over data rows.
    pub leads: Vec<(usize, NewLead)>,
    pub errors: Vec<String>,
}

/// Reject uploads whose name does not look like a CSV file.
///
/// # Errors
///
/// Returns `CoreError::Validation` unless the name ends in `.csv`.
pub fn check_file_name(name: &str) -> Result<(), CoreError> {
    if name.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(CoreError::Validation("File must be a CSV".to_string()))
    }
}

/// Parse CSV bytes into leads.
///
/// Rows without a phone number are skipped with a `Row N: Missing phone
/// number` error. Unknown columns are ignored.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the header row cannot be read or has no
/// phone column.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedImport, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let columns: Vec<Option<Column>> = reader
        .headers()
        .map_err(|e| CoreError::Validation(format!("Error processing CSV: {e}")))?
        .iter()
        .map(column_for)
        .collect();

    if !columns.contains(&Some(Column::Phone)) {
        return Err(CoreError::Validation(
            "Error processing CSV: no phone column".to_string(),
        ));
    }

    let mut parsed = ParsedImport::default();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                parsed.errors.push(format!("Row {row}: {e}"));
                continue;
            }
        };

        let mut lead = NewLead::default();
        for (value, column) in record.iter().zip(&columns) {
            let Some(column) = column else { continue };
            if value.is_empty() || value.eq_ignore_ascii_case("nan") {
                continue;
            }
            let value = value.to_string();
            match column {
                Column::FirstName => lead.first_name = Some(value),
                Column::LastName => lead.last_name = Some(value),
                Column::Email => lead.email = Some(value),
                Column::Phone => lead.phone = value,
                Column::Address => lead.address = Some(value),
                Column::Address2 => lead.address2 = Some(value),
                Column::City => lead.city = Some(value),
                Column::State => lead.state = Some(value),
                Column::Zip => lead.zip = Some(value),
                Column::Notes => lead.notes = Some(value),
            }
        }

        if lead.validate().is_err() {
            parsed.errors.push(format!("Row {row}: Missing phone number"));
            continue;
        }
        parsed.leads.push((row, lead));
    }
    Ok(parsed)
}

/// Build the import response, capping the reported errors.
#[must_use]
pub fn summarize(leads_created: usize, mut errors: Vec<String>) -> ImportResult {
    let errors = if errors.is_empty() {
        None
    } else {
        let extra = errors.len().saturating_sub(MAX_REPORTED_ERRORS);
        errors.truncate(MAX_REPORTED_ERRORS);
        if extra > 0 {
            errors.push(format!("... and {extra} more errors"));
        }
        Some(errors)
    };
    ImportResult {
        message: format!("Successfully imported {leads_created} leads"),
        leads_created,
        errors,
    }
}
