pub mod assemble;
pub mod card;
pub mod directory;
pub mod error;
pub mod phone;
pub mod pipeline;

pub use assemble::{
    assemble, order_entries, resolve_display_name, AssembleOptions, Assembly, EntryOrder,
    OutputEntry, FALLBACK_DISPLAY_NAME,
};
pub use card::{parse_card, split_cards, ContactRecord, PhoneEntry, RawCard};
pub use directory::{render_directory, RenderOptions};
pub use error::{CoreError, MalformedCardError};
pub use phone::{
    classify, clean_number, normalize_phone, InternationalPrefix, NormalizedPhone, PhoneCategory,
    TypeTag,
};
pub use pipeline::{convert, Conversion, ConvertOptions, ConvertReport, SkippedRecord};
