//! Digest rendering.
//!
//! - [`text`]: the human-readable digest sent as a message
//! - [`json`]: the same items as a JSON document
//!
//! Both renderers are total: they never fail and never return an empty
//! string, whatever the item list looks like.

pub mod json;
pub mod text;
