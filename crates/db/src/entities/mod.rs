//! Database entities.

pub mod emoticon;

pub use emoticon::Entity as Emoticon;
