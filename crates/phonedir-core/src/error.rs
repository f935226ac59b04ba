use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("display name is required")]
    EmptyDisplayName,
    #[error("directory entry needs at least one phone number")]
    EmptyNumbers,
    #[error("invalid international prefix: {0:?}")]
    InvalidInternationalPrefix(String),
}

/// Structural problems that make a single card unusable.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedCardError {
    #[error("missing BEGIN:VCARD")]
    MissingBegin,
    #[error("missing END:VCARD")]
    MissingEnd,
    #[error("missing VERSION property")]
    MissingVersion,
    #[error("nested BEGIN:VCARD")]
    NestedBegin,
    #[error("unexpected content after END:VCARD")]
    TrailingContent,
}
