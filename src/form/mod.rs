//! Form data model: field values, group entries, attachments, and paths.

pub mod path;
pub mod value;

pub use value::{
    AttachmentHandle, DocumentAttachment, EntryId, FieldValue, GroupEntry, Record, record,
};
