//! Typed field values, repeatable-group entries, and document attachments.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A step payload or nested section: field name → value.
pub type Record = BTreeMap<String, FieldValue>;

/// Identity token of one repeatable-group entry.
///
/// Independent of the entry's position in the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Mint a fresh token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntryId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One item of a repeatable group (e.g. one certification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: EntryId,
    pub fields: Record,
}

impl GroupEntry {
    /// Create an entry with a fresh token.
    pub fn new(fields: Record) -> Self {
        Self {
            id: EntryId::new(),
            fields,
        }
    }
}

/// Opaque handle to the raw bytes of an uploaded file.
///
/// Deliberately not `Serialize`: raw bytes never reach the draft slot.
/// Clones share the same bytes; dropping the last clone releases them.
#[derive(Clone)]
pub struct AttachmentHandle {
    id: Uuid,
    bytes: Arc<[u8]>,
}

impl AttachmentHandle {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: bytes.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for AttachmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentHandle")
            .field("id", &self.id)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PartialEq for AttachmentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Metadata about a single uploaded file plus the handle to its bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub handle: AttachmentHandle,
}

impl DocumentAttachment {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        handle: AttachmentHandle,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            handle,
        }
    }

    /// Build an attachment from bytes already read by the upload collaborator.
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let size_bytes = bytes.len() as u64;
        Self::new(file_name, mime_type, size_bytes, AttachmentHandle::new(bytes))
    }

    /// Metadata view used by summaries (no bytes, no handle).
    pub fn metadata_json(&self) -> serde_json::Value {
        serde_json::json!({
            "fileName": self.file_name,
            "mimeType": self.mime_type,
            "sizeBytes": self.size_bytes,
        })
    }
}

/// Best-effort MIME type from a file extension.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Value of one form field.
///
/// Serializes to plain JSON. Groups become arrays of `{id, fields}` objects;
/// records become objects. `Document` has no serialized form and must be
/// stripped before writing a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    /// JSON has no NaN or infinity; edits reject non-finite numbers.
    Number(f64),
    Text(String),
    Group(Vec<GroupEntry>),
    Record(Record),
    #[serde(skip)]
    Document(DocumentAttachment),
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Null
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<DocumentAttachment> for FieldValue {
    fn from(doc: DocumentAttachment) -> Self {
        Self::Document(doc)
    }
}

impl From<Record> for FieldValue {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Vec<GroupEntry>> for FieldValue {
    fn from(entries: Vec<GroupEntry>) -> Self {
        Self::Group(entries)
    }
}

impl FieldValue {
    /// False if this value or anything nested in it is a NaN or infinite number.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            Self::Record(record) => record.values().all(Self::is_finite),
            Self::Group(entries) => entries
                .iter()
                .all(|entry| entry.fields.values().all(Self::is_finite)),
            _ => true,
        }
    }

    /// Null, or text with no characters.
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Group(_) => "group",
            Self::Record(_) => "record",
            Self::Document(_) => "document",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&[GroupEntry]> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentAttachment> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }

    /// JSON rendering for review screens. Attachments appear as metadata.
    pub fn to_summary_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Document(doc) => doc.metadata_json(),
            Self::Record(record) => record_summary_json(record),
            Self::Group(entries) => serde_json::Value::Array(
                entries
                    .iter()
                    .map(|entry| {
                        serde_json::json!({
                            "id": entry.id.to_string(),
                            "fields": record_summary_json(&entry.fields),
                        })
                    })
                    .collect(),
            ),
        }
    }
}

/// JSON rendering of a whole record for review screens.
pub fn record_summary_json(record: &Record) -> serde_json::Value {
    serde_json::Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), v.to_summary_json()))
            .collect(),
    )
}

/// Build a [`Record`] from `(name, value)` pairs.
pub fn record<I, K, V>(fields: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_numbers_are_detected_when_nested() {
        assert!(FieldValue::Number(2020.0).is_finite());
        assert!(!FieldValue::Number(f64::NAN).is_finite());
        let nested = FieldValue::Group(vec![GroupEntry::new(record([(
            "score",
            FieldValue::Number(f64::INFINITY),
        )]))]);
        assert!(!nested.is_finite());
        assert!(!FieldValue::Record(record([("inner", nested)])).is_finite());
    }

    #[test]
    fn absent_values() {
        assert!(FieldValue::Null.is_absent());
        assert!(FieldValue::from("").is_absent());
        assert!(!FieldValue::from(" ").is_absent());
        assert!(!FieldValue::Bool(false).is_absent());
        assert!(!FieldValue::Group(vec![]).is_absent());
    }

    #[test]
    fn serde_plain_json_shape() {
        let entry = GroupEntry::new(record([("issuingBody", "IAPP")]));
        let id = entry.id;
        let value = FieldValue::Record(record([
            ("degreeType", FieldValue::from("master")),
            ("year", FieldValue::Number(2020.0)),
            ("certifications", FieldValue::Group(vec![entry])),
            ("note", FieldValue::Null),
        ]));

        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["degreeType"], "master");
        assert_eq!(json["year"], 2020.0);
        assert_eq!(json["certifications"][0]["id"], id.to_string());
        assert_eq!(json["certifications"][0]["fields"]["issuingBody"], "IAPP");
        assert!(json["note"].is_null());

        let parsed: FieldValue = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn document_refuses_to_serialize() {
        let doc = DocumentAttachment::from_bytes("cv.pdf", "application/pdf", vec![1, 2, 3]);
        assert!(serde_json::to_value(FieldValue::Document(doc)).is_err());
    }

    #[test]
    fn attachment_clones_share_bytes() {
        let doc = DocumentAttachment::from_bytes("id.png", "image/png", vec![7; 16]);
        let copy = doc.clone();
        assert_eq!(doc, copy);
        assert_eq!(copy.handle.bytes().len(), 16);
        assert_eq!(copy.size_bytes, 16);

        let other = DocumentAttachment::from_bytes("id.png", "image/png", vec![7; 16]);
        assert_ne!(doc.handle, other.handle);
    }

    #[test]
    fn summary_renders_attachment_metadata() {
        let doc = DocumentAttachment::from_bytes("degree.pdf", "application/pdf", vec![0; 10]);
        let value = FieldValue::Record(record([("degreeDocument", doc)]));
        let json = value.to_summary_json();
        assert_eq!(json["degreeDocument"]["fileName"], "degree.pdf");
        assert_eq!(json["degreeDocument"]["mimeType"], "application/pdf");
        assert_eq!(json["degreeDocument"]["sizeBytes"], 10);
    }

    #[test]
    fn mime_guessing() {
        assert_eq!(guess_mime_type("Degree.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("photo.jpeg"), "image/jpeg");
        assert_eq!(guess_mime_type("scan.png"), "image/png");
        assert_eq!(guess_mime_type("archive"), "application/octet-stream");
    }

    #[test]
    fn entry_id_parses_from_display() {
        let id = EntryId::new();
        let parsed: EntryId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
