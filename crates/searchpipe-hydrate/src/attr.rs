//! Tagged attribute values returned by the external document store,
//! and their conversion into the shared document model.

use searchpipe_core::types::{DocMap, DocValue};

/// One stored item: attribute name to tagged value, in store order.
pub type AttrItem = Vec<(String, AttrValue)>;

/// The store's wire representation of a stored value. Closed sum:
/// the store client maps anything it does not recognize to `Null`,
/// which converts to "absent" rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Vec<u8>>),
    M(Vec<(String, AttrValue)>),
    L(Vec<AttrValue>),
    Bool(bool),
    Null,
}

/// Convert one tagged value into the document model.
///
/// `None` means the value has no document representation and the
/// caller omits the field. Numeric values keep their textual form
/// verbatim; sets become lists in the store's returned order; map
/// entries and list elements that convert to `None` are dropped,
/// preserving the relative order of the rest.
pub fn convert(value: AttrValue) -> Option<DocValue> {
    match value {
        AttrValue::S(s) => Some(DocValue::Str(s)),
        AttrValue::N(n) => Some(DocValue::Num(n)),
        AttrValue::B(bytes) => Some(DocValue::Bytes(bytes)),
        AttrValue::Bool(b) => Some(DocValue::Bool(b)),
        AttrValue::Ss(items) => Some(DocValue::List(items.into_iter().map(DocValue::Str).collect())),
        AttrValue::Ns(items) => Some(DocValue::List(items.into_iter().map(DocValue::Num).collect())),
        AttrValue::Bs(items) => {
            Some(DocValue::List(items.into_iter().map(DocValue::Bytes).collect()))
        }
        AttrValue::M(entries) => Some(DocValue::Map(convert_entries(entries))),
        AttrValue::L(elements) => {
            Some(DocValue::List(elements.into_iter().filter_map(convert).collect()))
        }
        // Untyped values are treated as nonexistent, not as null.
        AttrValue::Null => None,
    }
}

/// Convert a whole store item into a top-level map node, dropping
/// attributes with no document representation.
pub fn convert_item(item: AttrItem) -> DocValue {
    DocValue::Map(convert_entries(item))
}

fn convert_entries(entries: Vec<(String, AttrValue)>) -> DocMap {
    entries
        .into_iter()
        .filter_map(|(name, value)| convert(value).map(|converted| (name, converted)))
        .collect()
}
