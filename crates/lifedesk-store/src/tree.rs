use std::collections::{BTreeMap, HashSet};

use lifedesk_shared::WorkspaceState;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    Root,
    Parent(String),
}

/// Bring the page tree back to a consistent shape. Returns how many pages had
/// their links changed; `0` means the tree was already consistent.
///
/// Rules, in priority order:
/// - ids that name no page are dropped from `rootPages` and `children`;
/// - a `parentId` naming an existing page decides the owner;
/// - otherwise `rootPages` wins, then the first page (by id) listing it;
/// - cycles are cut by promoting one page of the cycle to the root list;
/// - pages nobody lists are appended to `rootPages`.
///
/// Running it on its own output changes nothing.
pub fn reconcile_tree(state: &mut WorkspaceState) -> usize {
    let ids: HashSet<String> = state.pages.keys().cloned().collect();
    let mut repairs = 0;

    // Forget ids that point nowhere, self links and repeats
    let cleaned_roots = dedup_existing(&state.root_pages, &ids, None);
    if cleaned_roots != state.root_pages {
        state.root_pages = cleaned_roots;
        repairs += 1;
    }
    for (id, page) in state.pages.iter_mut() {
        let cleaned = dedup_existing(&page.children, &ids, Some(id));
        if cleaned != page.children {
            page.children = cleaned;
            repairs += 1;
        }
    }

    let mut owners: BTreeMap<String, Owner> = BTreeMap::new();
    for (id, page) in &state.pages {
        let owner = match page.parent_id.as_deref() {
            Some(parent) if parent != id.as_str() && ids.contains(parent) => {
                Owner::Parent(parent.to_string())
            }
            _ if state.root_pages.contains(id) => Owner::Root,
            _ => state
                .pages
                .iter()
                .find(|(_, candidate)| candidate.children.contains(id))
                .map(|(parent, _)| Owner::Parent(parent.clone()))
                .unwrap_or(Owner::Root),
        };
        owners.insert(id.clone(), owner);
    }

    break_cycles(&mut owners);

    for (id, owner) in &owners {
        let parent = match owner {
            Owner::Root => None,
            Owner::Parent(parent) => Some(parent.clone()),
        };
        if let Some(page) = state.pages.get_mut(id) {
            if page.parent_id != parent {
                page.parent_id = parent;
                repairs += 1;
            }
        }
    }

    // Rebuild owner lists, keeping the stored order for pages that stay
    let mut roots: Vec<String> = state
        .root_pages
        .iter()
        .filter(|id| owners.get(*id) == Some(&Owner::Root))
        .cloned()
        .collect();
    roots.extend(unlisted(state, &owners, &Owner::Root, &roots));
    if roots != state.root_pages {
        state.root_pages = roots;
        repairs += 1;
    }

    let page_ids: Vec<String> = state.pages.keys().cloned().collect();
    for id in page_ids {
        let owner = Owner::Parent(id.clone());
        let current = state.pages.get(&id).map(|p| p.children.clone()).unwrap_or_default();
        let mut children: Vec<String> = current
            .iter()
            .filter(|child| owners.get(*child) == Some(&owner))
            .cloned()
            .collect();
        children.extend(unlisted(state, &owners, &owner, &children));

        if let Some(page) = state.pages.get_mut(&id) {
            if page.children != children {
                page.children = children;
                repairs += 1;
            }
        }
    }

    if let Some(current) = &state.current_page_id {
        if !state.pages.contains_key(current) {
            state.current_page_id = None;
            repairs += 1;
        }
    }

    repairs
}

fn dedup_existing(
    list: &[String],
    ids: &HashSet<String>,
    own_id: Option<&String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    list.iter()
        .filter(|id| ids.contains(*id) && Some(*id) != own_id && seen.insert((*id).clone()))
        .cloned()
        .collect()
}

/// Pages owned by `owner` that are missing from `listed`, oldest first
fn unlisted(
    state: &WorkspaceState,
    owners: &BTreeMap<String, Owner>,
    owner: &Owner,
    listed: &[String],
) -> Vec<String> {
    let mut missing: Vec<(i64, &String)> = owners
        .iter()
        .filter(|(id, o)| *o == owner && !listed.contains(*id))
        .map(|(id, _)| (state.pages.get(id).map(|p| p.created_at).unwrap_or(0), id))
        .collect();
    missing.sort();
    missing.into_iter().map(|(_, id)| id.clone()).collect()
}

/// Promote one page of every ownership cycle to the root list
fn break_cycles(owners: &mut BTreeMap<String, Owner>) {
    let ids: Vec<String> = owners.keys().cloned().collect();
    let limit = ids.len();

    for id in ids {
        let mut cursor = owners.get(&id).cloned();
        let mut steps = 0;
        while let Some(Owner::Parent(parent)) = cursor {
            if parent == id {
                tracing::warn!(page = %id, "Breaking page cycle");
                owners.insert(id.clone(), Owner::Root);
                break;
            }
            steps += 1;
            if steps > limit {
                break;
            }
            cursor = owners.get(&parent).cloned();
        }
    }
}
