use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{generate_id, ModelError};

/// Key inside `Block::data` that holds embedded media (usually a base64 data URL).
pub const MEDIA_URL_FIELD: &str = "url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Header,
    Image,
    Video,
    Table,
}

impl BlockKind {
    pub const ALL: [BlockKind; 5] = [
        BlockKind::Text,
        BlockKind::Header,
        BlockKind::Image,
        BlockKind::Video,
        BlockKind::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Header => "header",
            Self::Image => "image",
            Self::Video => "video",
            Self::Table => "table",
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }

    /// Fields of `data` that are never written to the local store for this kind.
    pub fn unstored_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Image | Self::Video => &[MEDIA_URL_FIELD],
            Self::Text | Self::Header | Self::Table => &[],
        }
    }

    /// Apply this kind's storage rule to a block payload.
    /// Returns how many fields were removed.
    pub fn strip_for_storage(&self, data: &mut Map<String, Value>) -> usize {
        self.unstored_fields()
            .iter()
            .filter(|field| data.remove(**field).is_some())
            .count()
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownBlockKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl Block {
    pub fn new(kind: BlockKind, order: i64) -> Self {
        Self {
            id: generate_id("block"),
            kind,
            content: String::new(),
            order,
            data: Map::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn media_url(&self) -> Option<&str> {
        self.data.get(MEDIA_URL_FIELD).and_then(Value::as_str)
    }

    pub fn apply(&mut self, patch: BlockPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(data) = patch.data {
            for (key, value) in data {
                if value.is_null() {
                    self.data.remove(&key);
                } else {
                    self.data.insert(key, value);
                }
            }
        }
    }
}

/// Partial update for a block. `data` is merged key by key; a `null` value
/// removes the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<BlockKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn media_kinds_drop_url_only() {
        let mut data = json!({ "url": "data:image/png;base64,AAAA", "width": 100 })
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(BlockKind::Image.strip_for_storage(&mut data), 1);
        assert_eq!(Value::Object(data), json!({ "width": 100 }));
    }

    #[test]
    fn text_kinds_keep_url() {
        let mut data = json!({ "url": "https://example.com" }).as_object().cloned().unwrap();

        assert_eq!(BlockKind::Text.strip_for_storage(&mut data), 0);
        assert_eq!(BlockKind::Table.strip_for_storage(&mut data), 0);
        assert!(data.contains_key("url"));
    }

    #[test]
    fn block_serializes_type_tag_and_omits_empty_data() {
        let block = Block::new(BlockKind::Header, 2).with_content("Intro");
        let value = serde_json::to_value(&block).unwrap();

        assert_eq!(value["type"], "header");
        assert_eq!(value["order"], 2);
        assert!(value.get("data").is_none());
    }

    #[test]
    fn unknown_block_type_is_rejected() {
        let raw = json!({ "id": "b1", "type": "audio", "content": "", "order": 0 });
        assert!(serde_json::from_value::<Block>(raw).is_err());
        assert_eq!(
            "audio".parse::<BlockKind>(),
            Err(ModelError::UnknownBlockKind("audio".to_string()))
        );
        assert_eq!("Video".parse::<BlockKind>(), Ok(BlockKind::Video));
    }

    #[test]
    fn patch_merges_data_and_null_removes() {
        let mut block = Block::new(BlockKind::Image, 0)
            .with_data("url", json!("https://cdn/x.png"))
            .with_data("width", json!(100));

        block.apply(BlockPatch {
            data: Some(
                json!({ "width": 320, "url": null, "caption": "Sunset" })
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            ..Default::default()
        });

        assert_eq!(
            Value::Object(block.data.clone()),
            json!({ "width": 320, "caption": "Sunset" })
        );
        assert_eq!(block.kind, BlockKind::Image);
    }
}
