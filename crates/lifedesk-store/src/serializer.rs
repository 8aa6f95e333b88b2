//! Quota-safe snapshot encoding.
//!
//! Embedded media inside image and video blocks can be megabytes of base64,
//! which would blow through the local store's budget. Every block kind
//! carries its own storage rule (`BlockKind::strip_for_storage`); the
//! snapshot is the workspace with those rules applied to a copy.

use lifedesk_shared::WorkspaceState;

use crate::StoreError;

/// Copy of `state` in the shape it is persisted in. `state` is left as is.
pub fn to_storable(state: &WorkspaceState) -> WorkspaceState {
    let mut copy = state.clone();
    let stripped = strip_unstored(&mut copy);
    if stripped > 0 {
        tracing::debug!(stripped, "Dropped embedded media from snapshot");
    }
    copy
}

/// Apply every block's storage rule in place. Returns the number of fields removed.
pub fn strip_unstored(state: &mut WorkspaceState) -> usize {
    state
        .pages
        .values_mut()
        .flat_map(|page| page.blocks.iter_mut())
        .map(|block| block.kind.strip_for_storage(&mut block.data))
        .sum()
}

/// JSON record for the local store
pub fn encode_snapshot(state: &WorkspaceState) -> Result<String, StoreError> {
    Ok(serde_json::to_string(&to_storable(state))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifedesk_shared::{Block, BlockKind, Page};
    use serde_json::json;

    fn state_with(blocks: Vec<Block>) -> WorkspaceState {
        let mut state = WorkspaceState::empty();
        let mut page = Page::new(Some("Media"), None);
        page.blocks = blocks;
        state.root_pages.push(page.id.clone());
        state.pages.insert(page.id.clone(), page);
        state
    }

    #[test]
    fn storable_copy_strips_media_without_touching_original() {
        let state = state_with(vec![
            Block::new(BlockKind::Image, 0)
                .with_data("url", json!("data:image/png;base64,AAAA"))
                .with_data("width", json!(100)),
            Block::new(BlockKind::Video, 1).with_data("url", json!("data:video/mp4;base64,BBBB")),
            Block::new(BlockKind::Text, 2)
                .with_content("link")
                .with_data("url", json!("https://example.com")),
        ]);

        let storable = to_storable(&state);
        let page = storable.pages.values().next().unwrap();

        assert_eq!(page.blocks[0].media_url(), None);
        assert_eq!(page.blocks[0].data.get("width"), Some(&json!(100)));
        assert!(page.blocks[1].data.is_empty());
        assert_eq!(page.blocks[2].media_url(), Some("https://example.com"));

        let original = state.pages.values().next().unwrap();
        assert!(original.blocks[0].media_url().is_some());
        assert!(original.blocks[1].media_url().is_some());
    }

    #[test]
    fn encoded_snapshot_contains_no_data_urls() {
        let state = state_with(vec![Block::new(BlockKind::Image, 0)
            .with_content("cat")
            .with_data("url", json!("data:image/png;base64,AAAA"))]);

        let encoded = encode_snapshot(&state).unwrap();

        assert!(!encoded.contains("data:image"));
        assert!(encoded.contains("\"cat\""));
    }
}
