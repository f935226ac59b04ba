use crate::Result;
use phonedir_core::RawCard;

/// Where the cards of one run come from. A fetch either returns the whole
/// batch or fails; callers never see a partial list.
pub trait CardSource {
    fn source_name(&self) -> &'static str;
    fn fetch_cards(&self) -> Result<Vec<RawCard>>;
}
