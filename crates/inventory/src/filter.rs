//! Local search over a loaded item list.

use crate::item::Item;

/// Case-insensitive substring filter on item names.
///
/// An empty query returns every item; order is preserved from the source
/// sequence either way (the store's enumeration order, whatever it was).
pub fn filter<'a>(items: &'a [Item], query: &str) -> Vec<&'a Item> {
    if query.is_empty() {
        return items.iter().collect();
    }

    // Keys are already lower-cased, so only the query needs folding.
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.name.as_str().contains(&needle))
        .collect()
}
