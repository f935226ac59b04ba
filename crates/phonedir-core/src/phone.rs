use crate::card::PhoneEntry;
use crate::error::CoreError;
use serde::Serialize;

pub const DEFAULT_INTERNATIONAL_PREFIX: &str = "00";

/// The three number kinds the phone directory knows about. Declaration order
/// is the order numbers are listed within an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PhoneCategory {
    Mobile,
    Telephone,
    Other,
}

impl PhoneCategory {
    pub const ALL: [PhoneCategory; 3] = [
        PhoneCategory::Mobile,
        PhoneCategory::Telephone,
        PhoneCategory::Other,
    ];

    pub fn element_name(self) -> &'static str {
        match self {
            PhoneCategory::Mobile => "Mobile",
            PhoneCategory::Telephone => "Telephone",
            PhoneCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Cell,
    Work,
    Voice,
    Home,
    Pref,
    Unrecognized,
}

impl TypeTag {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cell" | "mobile" | "iphone" => TypeTag::Cell,
            "work" | "office" | "desk" => TypeTag::Work,
            "voice" => TypeTag::Voice,
            "home" => TypeTag::Home,
            "pref" => TypeTag::Pref,
            _ => TypeTag::Unrecognized,
        }
    }
}

/// Maps a number's type tags onto a directory category.
///
/// A work tag wins over a cell tag, so `work,cell` is `Telephone`. Home
/// numbers land in `Other`: the device labels `Telephone` as the office
/// line. A bare `voice` tag counts as `Telephone` only when no home or
/// unrecognized qualifier sits next to it.
pub fn classify<S: AsRef<str>>(tags: &[S]) -> PhoneCategory {
    let mut cell = false;
    let mut work = false;
    let mut voice = false;
    let mut qualified = false;

    for tag in tags {
        match TypeTag::parse(tag.as_ref()) {
            TypeTag::Cell => cell = true,
            TypeTag::Work => work = true,
            TypeTag::Voice => voice = true,
            TypeTag::Home | TypeTag::Unrecognized => qualified = true,
            TypeTag::Pref => {}
        }
    }

    if work {
        PhoneCategory::Telephone
    } else if cell {
        PhoneCategory::Mobile
    } else if voice && !qualified {
        PhoneCategory::Telephone
    } else {
        PhoneCategory::Other
    }
}

/// Digits substituted for a leading `+`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InternationalPrefix(String);

impl InternationalPrefix {
    pub fn new(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(CoreError::InvalidInternationalPrefix(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InternationalPrefix {
    fn default() -> Self {
        Self(DEFAULT_INTERNATIONAL_PREFIX.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedPhone {
    digits: String,
    category: PhoneCategory,
}

impl NormalizedPhone {
    /// Digits only, optionally led by a single `*`. Never empty.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn category(&self) -> PhoneCategory {
        self.category
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Plus,
    Star,
}

/// Reduces a raw number to digits. Only the first significant character may be
/// a `+` (rewritten to `prefix`) or a `*` (kept); anything else that is not a
/// digit is dropped. Returns `None` when no digit survives.
pub fn clean_number(raw: &str, prefix: &InternationalPrefix) -> Option<String> {
    let mut marker = None;
    let mut digits = String::with_capacity(raw.len());

    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if marker.is_none() && digits.is_empty() {
            marker = match ch {
                '+' => Some(Marker::Plus),
                '*' => Some(Marker::Star),
                _ => None,
            };
        }
    }

    if digits.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(digits.len() + prefix.as_str().len());
    match marker {
        Some(Marker::Plus) => out.push_str(prefix.as_str()),
        Some(Marker::Star) => out.push('*'),
        None => {}
    }
    out.push_str(&digits);
    Some(out)
}

pub fn normalize_phone(entry: &PhoneEntry, prefix: &InternationalPrefix) -> Option<NormalizedPhone> {
    let digits = clean_number(&entry.number, prefix)?;
    Some(NormalizedPhone {
        digits,
        category: classify(entry.type_tags.as_slice()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(raw: &str) -> Option<String> {
        clean_number(raw, &InternationalPrefix::default())
    }

    #[test]
    fn clean_number_rewrites_leading_plus() {
        assert_eq!(clean("+491701234567").as_deref(), Some("00491701234567"));
        assert_eq!(clean("  +1 (555) 123-4567").as_deref(), Some("0015551234567"));
    }

    #[test]
    fn clean_number_uses_configured_prefix() {
        let prefix = InternationalPrefix::new("011").unwrap();
        assert_eq!(
            clean_number("+44 20 7946 0000", &prefix).as_deref(),
            Some("011442079460000")
        );
    }

    #[test]
    fn clean_number_is_idempotent_on_digits() {
        for raw in ["5551234567", "00491701234567", "*31", "0"] {
            assert_eq!(clean(raw).as_deref(), Some(raw));
        }
    }

    #[test]
    fn clean_number_strips_formatting() {
        assert_eq!(clean("555.999.0000").as_deref(), Some("5559990000"));
        assert_eq!(clean("(030) 1234 / 56-78").as_deref(), Some("03012345678"));
        assert_eq!(clean("555 1234 ext. 9").as_deref(), Some("55512349"));
    }

    #[test]
    fn clean_number_keeps_only_a_leading_marker() {
        assert_eq!(clean("*31#").as_deref(), Some("*31"));
        assert_eq!(clean("(*) 12").as_deref(), Some("*12"));
        assert_eq!(clean("12*34+5").as_deref(), Some("12345"));
        assert_eq!(clean("+*49").as_deref(), Some("0049"));
        assert_eq!(clean("**7").as_deref(), Some("*7"));
    }

    #[test]
    fn clean_number_discards_numbers_without_digits() {
        for raw in ["", "   ", "---", "*", "+", "+*", "ext", "n/a"] {
            assert_eq!(clean(raw), None, "raw: {raw:?}");
        }
    }

    #[test]
    fn classify_maps_tags() {
        assert_eq!(classify(&["CELL"]), PhoneCategory::Mobile);
        assert_eq!(classify(&["Cell"]), PhoneCategory::Mobile);
        assert_eq!(classify(&["mobile"]), PhoneCategory::Mobile);
        assert_eq!(classify(&["home"]), PhoneCategory::Other);
        assert_eq!(classify(&["work"]), PhoneCategory::Telephone);
        assert_eq!(classify(&["office"]), PhoneCategory::Telephone);
        assert_eq!(classify(&["desk"]), PhoneCategory::Telephone);
        assert_eq!(classify::<&str>(&[]), PhoneCategory::Other);
        assert_eq!(classify(&["pref"]), PhoneCategory::Other);
        assert_eq!(classify(&["fax"]), PhoneCategory::Other);
    }

    #[test]
    fn classify_resolves_mixed_tags() {
        assert_eq!(classify(&["work", "cell"]), PhoneCategory::Telephone);
        assert_eq!(classify(&["CELL", "desk"]), PhoneCategory::Telephone);
        assert_eq!(classify(&["cell", "voice"]), PhoneCategory::Mobile);
        assert_eq!(classify(&["cell", "home"]), PhoneCategory::Mobile);
        assert_eq!(classify(&["voice"]), PhoneCategory::Telephone);
        assert_eq!(classify(&["voice", "pref"]), PhoneCategory::Telephone);
        assert_eq!(classify(&["voice", "home"]), PhoneCategory::Other);
        assert_eq!(classify(&["voice", "fax"]), PhoneCategory::Other);
        assert_eq!(classify(&["home", "work"]), PhoneCategory::Telephone);
    }

    #[test]
    fn normalize_phone_combines_cleaning_and_category() {
        let prefix = InternationalPrefix::default();
        let phone = normalize_phone(&PhoneEntry::new("+1 (555) 123-4567", &["cell"]), &prefix)
            .expect("phone");
        assert_eq!(phone.digits(), "0015551234567");
        assert_eq!(phone.category(), PhoneCategory::Mobile);

        assert!(normalize_phone(&PhoneEntry::new("---", &["cell"]), &prefix).is_none());
    }

    #[test]
    fn international_prefix_requires_digits() {
        assert_eq!(InternationalPrefix::new(" 00 ").unwrap().as_str(), "00");
        assert!(InternationalPrefix::new("").is_err());
        assert!(InternationalPrefix::new("+").is_err());
        assert!(InternationalPrefix::new("0x").is_err());
    }

    #[test]
    fn categories_sort_by_priority() {
        let mut categories = vec![
            PhoneCategory::Other,
            PhoneCategory::Mobile,
            PhoneCategory::Telephone,
        ];
        categories.sort();
        assert_eq!(categories, PhoneCategory::ALL.to_vec());
    }
}
