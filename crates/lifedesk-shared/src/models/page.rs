use serde::{Deserialize, Serialize};

use super::Block;
use crate::{generate_id, now_millis};

/// Icon given to pages that never had one.
pub const DEFAULT_PAGE_ICON: &str = "📄";
/// Title used when a page is created without one.
pub const DEFAULT_PAGE_TITLE: &str = "Untitled";

fn default_icon() -> String {
    DEFAULT_PAGE_ICON.to_string()
}

fn default_title() -> String {
    DEFAULT_PAGE_TITLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Back-reference to the owning page. Ownership itself is expressed by the
    /// parent's `children` list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expanded: Option<bool>,
    #[serde(default = "default_icon")]
    pub icon: String,
}

impl Page {
    /// Create a detached page. The caller inserts it into `pages` and into its
    /// parent's `children` (or `rootPages`).
    pub fn new(title: Option<&str>, parent_id: Option<&str>) -> Self {
        let now = now_millis();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_title);

        Self {
            id: generate_id("page"),
            title,
            content: String::new(),
            blocks: Vec::new(),
            parent_id: parent_id.map(str::to_string),
            children: Vec::new(),
            created_at: now,
            updated_at: now,
            is_expanded: Some(true),
            icon: default_icon(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Blocks in render order. Blocks sharing an `order` keep their stored
    /// relative position.
    pub fn sorted_blocks(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.order);
        blocks
    }

    /// Order value that places a new block after every existing one
    pub fn next_block_order(&self) -> i64 {
        self.blocks.iter().map(|b| b.order.saturating_add(1)).max().unwrap_or(0)
    }

    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    pub fn block_mut(&mut self, block_id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == block_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }

    /// Merge the set fields of `patch` into this page.
    pub fn apply(&mut self, patch: PagePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(blocks) = patch.blocks {
            self.blocks = blocks;
        }
        if let Some(expanded) = patch.is_expanded {
            self.is_expanded = Some(expanded);
        }
        self.touch();
    }

    /// Case-insensitive match against title, content and block text
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.content.to_lowercase().contains(&needle)
            || self
                .blocks
                .iter()
                .any(|b| b.content.to_lowercase().contains(&needle))
    }
}

/// Partial page update. Tree links are not part of a patch; they change only
/// through create, move and delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_expanded: Option<bool>,
}

impl PagePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockKind;

    #[test]
    fn new_page_has_defaults() {
        let page = Page::new(None, None);

        assert_eq!(page.title, DEFAULT_PAGE_TITLE);
        assert_eq!(page.icon, DEFAULT_PAGE_ICON);
        assert!(page.blocks.is_empty());
        assert!(page.children.is_empty());
        assert_eq!(page.is_expanded, Some(true));
        assert_eq!(page.created_at, page.updated_at);
        assert!(page.is_root());
    }

    #[test]
    fn blank_title_falls_back() {
        assert_eq!(Page::new(Some("   "), None).title, DEFAULT_PAGE_TITLE);
        assert_eq!(Page::new(Some(" Notes "), None).title, "Notes");
    }

    #[test]
    fn patch_merges_only_set_fields() {
        let mut page = Page::new(Some("Journal"), None);
        page.content = "day one".to_string();

        page.apply(PagePatch::title("Diary"));

        assert_eq!(page.title, "Diary");
        assert_eq!(page.content, "day one");
        assert_eq!(page.icon, DEFAULT_PAGE_ICON);
    }

    #[test]
    fn sorted_blocks_follow_order_field() {
        let mut page = Page::new(Some("Doc"), None);
        page.blocks.push(Block::new(BlockKind::Text, 2).with_content("c"));
        page.blocks.push(Block::new(BlockKind::Header, 0).with_content("a"));
        page.blocks.push(Block::new(BlockKind::Text, 1).with_content("b"));

        let contents: Vec<&str> = page.sorted_blocks().iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert_eq!(page.next_block_order(), 3);
    }

    #[test]
    fn next_block_order_saturates_at_max() {
        let mut page = Page::new(Some("Doc"), None);
        page.blocks.push(Block::new(BlockKind::Text, i64::MAX));

        assert_eq!(page.next_block_order(), i64::MAX);
    }

    #[test]
    fn missing_optional_fields_deserialize_with_defaults() {
        let page: Page = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "title": "Old page"
        }))
        .unwrap();

        assert_eq!(page.icon, DEFAULT_PAGE_ICON);
        assert!(page.blocks.is_empty());
        assert!(page.parent_id.is_none());
        assert!(page.is_expanded.is_none());
    }

    #[test]
    fn search_matches_title_content_and_blocks() {
        let mut page = Page::new(Some("Groceries"), None);
        page.blocks.push(Block::new(BlockKind::Text, 0).with_content("Buy Oat milk"));

        assert!(page.matches("grocer"));
        assert!(page.matches("oat MILK"));
        assert!(page.matches(""));
        assert!(!page.matches("coffee"));
    }
}
