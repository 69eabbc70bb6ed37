//! Share records and the content they expose.
//!
//! # Data Flow
//! ```text
//! admin create → model.rs (NewShare → ShareRecord, fresh token)
//!              → store.rs (ShareRecordStore::put)
//!
//! access pipeline → store.rs (ShareRecordStore::get, read-only)
//! allowed email listing → mailbox.rs (MailboxSource::list)
//!                       → keyword.rs (narrow visible content)
//! ```

pub mod keyword;
pub mod mailbox;
pub mod model;
pub mod store;

pub use keyword::KeywordFilter;
pub use mailbox::{Email, MailboxSource, MemoryMailbox};
pub use model::{NewShare, ShareDefaults, ShareRecord, ShareStatus};
pub use store::{MemoryShareStore, ShareRecordStore, StoreError};
