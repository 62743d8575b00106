use super::*;

#[derive(Debug, thiserror::Error)]
pub(super) enum CommandError {
    #[error("text must not be empty")]
    EmptyText,
    #[error("position {position} is out of range ({count} items)")]
    OutOfRange { position: i64, count: usize },
    #[error("the item no longer exists")]
    ItemGone,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ListedItem {
    pub(super) position: usize,
    pub(super) item: Item,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ItemList {
    Empty,
    Items(Vec<ListedItem>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Edit {
    pub(super) old: String,
    pub(super) new: String,
}

/// Blank or unknown tokens resolve to `None`, never to an error.
pub(super) async fn resolve_token(
    store: &dyn Store,
    token: &str,
) -> Result<Option<Account>, StoreError> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }
    store.account_by_token(token).await
}

pub(super) async fn list_items(store: &dyn Store, owner_id: i64) -> Result<ItemList, CommandError> {
    let items = store.items_for(owner_id).await?;
    if items.is_empty() {
        return Ok(ItemList::Empty);
    }
    let listed = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| ListedItem {
            position: idx + 1,
            item,
        })
        .collect();
    Ok(ItemList::Items(listed))
}

pub(super) async fn add_item(store: &dyn Store, owner_id: i64, text: &str) -> Result<Item, CommandError> {
    let text = require_text(text)?;
    Ok(store.insert_item(owner_id, text).await?)
}

/// Maps a 1-based position onto the owner's current list, fetched fresh.
pub(super) async fn resolve_position(
    store: &dyn Store,
    owner_id: i64,
    position: i64,
) -> Result<Item, CommandError> {
    let mut items = store.items_for(owner_id).await?;
    let count = items.len();
    if position < 1 || position as u64 > count as u64 {
        return Err(CommandError::OutOfRange { position, count });
    }
    Ok(items.swap_remove((position - 1) as usize))
}

pub(super) async fn delete_at(store: &dyn Store, owner_id: i64, position: i64) -> Result<Item, CommandError> {
    let item = resolve_position(store, owner_id, position).await?;
    if !store.delete_item(owner_id, item.id).await? {
        return Err(CommandError::ItemGone);
    }
    Ok(item)
}

pub(super) async fn edit_at(
    store: &dyn Store,
    owner_id: i64,
    position: i64,
    new_text: &str,
) -> Result<Edit, CommandError> {
    let new_text = require_text(new_text)?;
    let item = resolve_position(store, owner_id, position).await?;
    if !store.update_item(owner_id, item.id, new_text).await? {
        return Err(CommandError::ItemGone);
    }
    Ok(Edit {
        old: item.text,
        new: new_text.to_string(),
    })
}

pub(super) async fn delete_by_id(store: &dyn Store, owner_id: i64, item_id: i64) -> Result<bool, CommandError> {
    Ok(store.delete_item(owner_id, item_id).await?)
}

pub(super) async fn edit_by_id(
    store: &dyn Store,
    owner_id: i64,
    item_id: i64,
    new_text: &str,
) -> Result<bool, CommandError> {
    let new_text = require_text(new_text)?;
    Ok(store.update_item(owner_id, item_id, new_text).await?)
}

fn require_text(text: &str) -> Result<&str, CommandError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommandError::EmptyText);
    }
    Ok(text)
}
