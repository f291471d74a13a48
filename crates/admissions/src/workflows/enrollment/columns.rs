use std::fmt;

use serde::Serialize;

use super::normalizer::header_key;

/// Logical identity fields a registrar sheet must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityField {
    FirstName,
    LastName,
    Email,
    DateOfBirth,
}

impl IdentityField {
    pub const fn ordered() -> [IdentityField; 4] {
        [
            IdentityField::FirstName,
            IdentityField::LastName,
            IdentityField::Email,
            IdentityField::DateOfBirth,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            IdentityField::FirstName => "First Name",
            IdentityField::LastName => "Last Name",
            IdentityField::Email => "Email Address",
            IdentityField::DateOfBirth => "Birthdate",
        }
    }

    const fn aliases(self) -> &'static [&'static str] {
        match self {
            IdentityField::FirstName => &["First Name", "Given Name", "Firstname", "first_name"],
            IdentityField::LastName => &["Last Name", "Surname", "Lastname", "last_name"],
            IdentityField::Email => &["Email", "Email Address", "email"],
            IdentityField::DateOfBirth => &[
                "Birthdate",
                "Date of Birth",
                "Birthday",
                "DOB",
                "birth_date",
            ],
        }
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header names (as spelled in the upload) carrying each identity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
}

impl ColumnMap {
    pub fn column(&self, field: IdentityField) -> &str {
        match field {
            IdentityField::FirstName => &self.first_name,
            IdentityField::LastName => &self.last_name,
            IdentityField::Email => &self.email,
            IdentityField::DateOfBirth => &self.date_of_birth,
        }
    }
}

/// Raised when the upload lacks one of the four required identity columns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "required columns not found ({}); make sure the template includes First Name, Last Name, Email Address, and Birthdate",
    missing_labels(.missing)
)]
pub struct ColumnResolutionError {
    pub missing: Vec<IdentityField>,
}

fn missing_labels(missing: &[IdentityField]) -> String {
    missing
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Normalized header keys in first-seen order; a repeated key keeps the later spelling.
struct HeaderIndex<'a> {
    entries: Vec<(String, &'a str)>,
}

impl<'a> HeaderIndex<'a> {
    fn new(headers: &'a [String]) -> Self {
        let mut entries: Vec<(String, &'a str)> = Vec::with_capacity(headers.len());
        for header in headers {
            let key = header_key(header);
            if key.is_empty() {
                continue;
            }
            match entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = header.as_str(),
                None => entries.push((key, header.as_str())),
            }
        }
        Self { entries }
    }

    fn resolve(&self, field: IdentityField) -> Option<&'a str> {
        let alias_keys: Vec<String> = field.aliases().iter().map(|alias| header_key(alias)).collect();

        let exact = alias_keys.iter().find_map(|alias| {
            self.entries
                .iter()
                .find(|(key, _)| key == alias)
                .map(|(_, original)| *original)
        });
        if exact.is_some() {
            return exact;
        }

        self.entries
            .iter()
            .find(|(key, _)| alias_keys.iter().any(|alias| key.contains(alias.as_str())))
            .map(|(_, original)| *original)
    }
}

/// Resolve the four identity columns from a header row.
pub fn resolve_columns(headers: &[String]) -> Result<ColumnMap, ColumnResolutionError> {
    let index = HeaderIndex::new(headers);
    let mut resolved: [Option<&str>; 4] = [None; 4];
    let mut missing = Vec::new();

    for (slot, field) in resolved.iter_mut().zip(IdentityField::ordered()) {
        *slot = index.resolve(field);
        if slot.is_none() {
            missing.push(field);
        }
    }

    match resolved {
        [Some(first_name), Some(last_name), Some(email), Some(date_of_birth)] => Ok(ColumnMap {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            date_of_birth: date_of_birth.to_string(),
        }),
        _ => Err(ColumnResolutionError { missing }),
    }
}
