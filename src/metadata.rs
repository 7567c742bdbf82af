//! Metadata.
//!
//! Stacks and layers carry [`Metadata`]: JSON key-value attributes, kept in insertion order.
//! File formats surface their native attributes through it unchanged.

/// Key-value metadata attributes.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
