pub mod carddav;
pub mod error;
pub mod sink;
pub mod source;
pub mod vcf;

pub use carddav::{nextcloud_addressbook_url, CardDavOptions, CardDavSource};
pub use error::{Result, SyncError};
pub use sink::write_document;
pub use source::CardSource;
pub use vcf::VcfFileSource;
