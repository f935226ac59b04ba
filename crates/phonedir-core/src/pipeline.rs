use crate::assemble::{assemble, order_entries, AssembleOptions, EntryOrder, OutputEntry};
use crate::card::{parse_card, RawCard};
use crate::directory::{render_directory, RenderOptions};
use crate::error::{CoreError, MalformedCardError};
use crate::phone::InternationalPrefix;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub international_prefix: InternationalPrefix,
    pub order: EntryOrder,
    pub honorific_prefix: bool,
    pub render: RenderOptions,
}

/// A card that did not make it into the directory. `card` is the 1-based
/// position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkippedRecord {
    Malformed {
        card: usize,
        error: MalformedCardError,
    },
    NoNumbers {
        card: usize,
        display_name: String,
    },
    Invalid {
        card: usize,
        display_name: String,
        error: String,
    },
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkippedRecord::Malformed { card, error } => write!(f, "card {card}: {error}"),
            SkippedRecord::NoNumbers { card, display_name } => {
                write!(f, "card {card} ({display_name}): no usable phone numbers")
            }
            SkippedRecord::Invalid {
                card,
                display_name,
                error,
            } => write!(f, "card {card} ({display_name}): {error}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvertReport {
    pub cards: usize,
    pub entries: usize,
    pub malformed: usize,
    pub dropped: usize,
    pub discarded_numbers: usize,
    pub collapsed_duplicates: usize,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub document: String,
    pub entries: Vec<OutputEntry>,
    pub report: ConvertReport,
}

/// Turns a full batch of cards into a directory document. Bad cards and
/// numbers are skipped and reported; the batch itself never fails.
pub fn convert(cards: &[RawCard], options: &ConvertOptions) -> Conversion {
    let assemble_options = AssembleOptions {
        international_prefix: options.international_prefix.clone(),
        honorific_prefix: options.honorific_prefix,
    };
    let mut report = ConvertReport {
        cards: cards.len(),
        ..ConvertReport::default()
    };
    let mut entries = Vec::with_capacity(cards.len());

    for (idx, card) in cards.iter().enumerate() {
        let position = idx + 1;
        let record = match parse_card(card) {
            Ok(record) => record,
            Err(error) => {
                report.malformed += 1;
                report.skipped.push(SkippedRecord::Malformed {
                    card: position,
                    error,
                });
                continue;
            }
        };

        let assembly = assemble(&record, &assemble_options);
        report.discarded_numbers += assembly.discarded_numbers;
        report.collapsed_duplicates += assembly.collapsed_duplicates;
        match assembly.entry {
            Ok(entry) => entries.push(entry),
            Err(CoreError::EmptyNumbers) => {
                report.dropped += 1;
                report.skipped.push(SkippedRecord::NoNumbers {
                    card: position,
                    display_name: assembly.display_name,
                });
            }
            Err(error) => {
                report.dropped += 1;
                report.skipped.push(SkippedRecord::Invalid {
                    card: position,
                    display_name: assembly.display_name,
                    error: error.to_string(),
                });
            }
        }
    }

    order_entries(&mut entries, options.order);
    report.entries = entries.len();
    let document = render_directory(&entries, &options.render);

    Conversion {
        document,
        entries,
        report,
    }
}
