use lifedesk_shared::{Block, BlockKind};

use crate::{Action, Outcome, Workspace, WorkspaceError};

/// Give an empty workspace its first page. Returns the new page id, or `None`
/// when the workspace already had pages.
pub fn ensure_welcome_page(
    workspace: &mut Workspace,
    app_name: &str,
) -> Result<Option<String>, WorkspaceError> {
    if !workspace.state().pages.is_empty() {
        return Ok(None);
    }

    let Outcome::Created(page_id) = workspace.dispatch(Action::CreatePage {
        title: Some(format!("Welcome to {}", app_name)),
        parent_id: None,
    })?
    else {
        return Ok(None);
    };

    let intro = Block::new(BlockKind::Text, 0).with_content(format!(
        "This is your {} workspace. Create pages, track daily tasks, \
         plan your calendar and keep an eye on finances and health.",
        app_name
    ));
    workspace.dispatch(Action::AddBlock {
        page_id: page_id.clone(),
        block: intro,
    })?;
    workspace.dispatch(Action::SelectPage {
        id: Some(page_id.clone()),
    })?;

    tracing::info!(page = %page_id, "Created welcome page");
    Ok(Some(page_id))
}
