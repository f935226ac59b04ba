use crate::card::ContactRecord;
use crate::error::CoreError;
use crate::phone::{normalize_phone, InternationalPrefix, NormalizedPhone};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const FALLBACK_DISPLAY_NAME: &str = "Unknown";

/// One contact as it appears in the directory. Always has a name and at least
/// one number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEntry {
    display_name: String,
    numbers: Vec<NormalizedPhone>,
}

impl OutputEntry {
    pub fn new(display_name: impl Into<String>, numbers: Vec<NormalizedPhone>) -> Result<Self, CoreError> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(CoreError::EmptyDisplayName);
        }
        if numbers.is_empty() {
            return Err(CoreError::EmptyNumbers);
        }
        Ok(Self {
            display_name,
            numbers,
        })
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn numbers(&self) -> &[NormalizedPhone] {
        &self.numbers
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembleOptions {
    pub international_prefix: InternationalPrefix,
    /// Prepend the `N` honorific prefix ("Dr.") to the resolved name.
    pub honorific_prefix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub display_name: String,
    /// `Err(CoreError::EmptyNumbers)` when no number survived normalization.
    pub entry: Result<OutputEntry, CoreError>,
    pub discarded_numbers: usize,
    pub collapsed_duplicates: usize,
}

pub fn assemble(record: &ContactRecord, options: &AssembleOptions) -> Assembly {
    let display_name = resolve_display_name(record, options.honorific_prefix);

    let mut seen: HashSet<NormalizedPhone> = HashSet::new();
    let mut numbers = Vec::with_capacity(record.phone_entries.len());
    let mut discarded_numbers = 0;
    let mut collapsed_duplicates = 0;

    for phone_entry in &record.phone_entries {
        let Some(phone) = normalize_phone(phone_entry, &options.international_prefix) else {
            discarded_numbers += 1;
            continue;
        };
        if !seen.insert(phone.clone()) {
            collapsed_duplicates += 1;
            continue;
        }
        numbers.push(phone);
    }

    // Stable: parse order is kept within a category.
    numbers.sort_by_key(NormalizedPhone::category);

    let entry = OutputEntry::new(display_name.clone(), numbers);

    Assembly {
        display_name,
        entry,
        discarded_numbers,
        collapsed_duplicates,
    }
}

pub fn resolve_display_name(record: &ContactRecord, with_honorific_prefix: bool) -> String {
    let name = non_empty(record.formatted_name.as_deref())
        .map(str::to_string)
        .or_else(|| {
            let joined = [record.given_name.as_deref(), record.family_name.as_deref()]
                .into_iter()
                .filter_map(non_empty)
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        });

    let Some(name) = name else {
        return FALLBACK_DISPLAY_NAME.to_string();
    };

    if with_honorific_prefix {
        if let Some(prefix) = non_empty(record.honorific_prefix.as_deref()) {
            if !name.starts_with(prefix) {
                return format!("{prefix} {name}");
            }
        }
    }
    name
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOrder {
    /// Case-insensitive by display name.
    #[default]
    Name,
    /// As delivered by the card source.
    Source,
}

pub fn order_entries(entries: &mut [OutputEntry], order: EntryOrder) {
    match order {
        EntryOrder::Name => entries.sort_by_key(|entry| entry.display_name.to_lowercase()),
        EntryOrder::Source => {}
    }
}
