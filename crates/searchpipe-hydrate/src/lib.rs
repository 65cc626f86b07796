//! searchpipe-hydrate
//!
//! Response stage that joins a result set against an external
//! key-value document store and installs the fetched bodies as hit
//! sources. See `attr` for the store's tagged value representation,
//! `store` for the lookup contract and `processor` for the stage.

pub mod attr;
pub mod processor;
pub mod store;

pub use attr::{convert, convert_item, AttrItem, AttrValue};
pub use processor::{HydrateConfig, HydrateProcessor};
pub use store::DocumentStore;
