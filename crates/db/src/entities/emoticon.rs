//! Emoticon pack entity.

use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// An archived emoticon pack.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "emoticon")]
pub struct Model {
    /// Provider-assigned pack ID.
    #[sea_orm(primary_key, auto_increment = false)]
    pub emoticon_id: i64,

    /// Display name.
    pub name: String,

    /// Display description.
    pub description: String,

    /// Thumbnail URL.
    pub icon: String,

    /// Root-relative storage path, an absolute external URL, or empty before archiving.
    pub archive_url: String,

    /// Archive size in bytes.
    pub archive_size: i64,

    /// Whether the pack is animated.
    pub animated: bool,

    /// Images in provider order (JSON array of [`EmoticonImage`]).
    pub images: Json,

    /// Provider metadata, stored verbatim.
    pub metadata: Json,
}

/// Emoticon relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// One image of a pack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmoticonImage {
    pub keyword: String,
    /// Full-size image, animated when the pack is.
    pub src: String,
    /// Static preview.
    pub preview: String,
}

impl Model {
    /// Decoded image list. Malformed entries yield an empty list.
    #[must_use]
    pub fn image_list(&self) -> Vec<EmoticonImage> {
        serde_json::from_value(self.images.clone()).unwrap_or_default()
    }
}

/// A catalog listing row.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmoticonSummary {
    pub emoticon_id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub archive_url: String,
    pub archive_size: i64,
    pub animated: bool,
}

/// A single pack without its provider metadata.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmoticonDetail {
    pub emoticon_id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub archive_url: String,
    pub archive_size: i64,
    pub animated: bool,
    pub images: Json,
}

impl From<Model> for EmoticonDetail {
    fn from(model: Model) -> Self {
        Self {
            emoticon_id: model.emoticon_id,
            name: model.name,
            description: model.description,
            icon: model.icon,
            archive_url: model.archive_url,
            archive_size: model.archive_size,
            animated: model.animated,
            images: model.images,
        }
    }
}
