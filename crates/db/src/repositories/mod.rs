//! Data access repositories.

mod emoticon;

pub use emoticon::{EmoticonRepository, EmoticonStore};
