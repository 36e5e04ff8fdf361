//! Library mutation operations.
//!
//! Every operation validates its inputs first and leaves the registry
//! untouched on error. Deletes cascade: removing a category removes its
//! assets, removing an asset clears any default pointer at it.

use crate::{
    error::{PeepError, PeepResult},
    model::{Asset, Category, Registry},
};

/// Direction for pairwise category reordering.
///
/// `Forward` swaps with the next category in sorted draw order (toward the
/// viewer), `Backward` with the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Backward,
    Forward,
}

/// Derive a slug-style category id from a display name: lowercased, with
/// whitespace runs collapsed to `-`.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn new_asset_id(registry: &Registry) -> String {
    loop {
        let id = format!("{:032x}", rand::random::<u128>());
        if registry.asset(&id).is_none() {
            return id;
        }
    }
}

impl Registry {
    /// Create a category named `name` with a derived slug id and a draw
    /// order placed above every existing layer (`max + 10`).
    ///
    /// A slug collision with an existing category is an error, never a
    /// silent overwrite.
    pub fn create_category(&mut self, name: &str) -> PeepResult<&Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PeepError::validation("category name must be non-empty"));
        }
        let id = slugify(name);
        if self.category(&id).is_some() {
            return Err(PeepError::validation(format!(
                "category id '{id}' already exists"
            )));
        }
        let draw_order = self.max_draw_order() + 10;
        self.categories.push(Category {
            id,
            name: name.to_string(),
            draw_order,
            default_asset_id: None,
        });
        Ok(self.categories.last().expect("just pushed"))
    }

    pub fn rename_category(&mut self, id: &str, name: &str) -> PeepResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PeepError::validation("category name must be non-empty"));
        }
        let cat = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PeepError::validation(format!("unknown category '{id}'")))?;
        cat.name = name.to_string();
        Ok(())
    }

    /// Swap draw orders with the adjacent category in sorted order.
    /// Moving past either end of the stack is a no-op.
    pub fn move_category(&mut self, id: &str, direction: MoveDirection) -> PeepResult<()> {
        let sorted_ids: Vec<String> = self
            .sorted_categories()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        let pos = sorted_ids
            .iter()
            .position(|c| c == id)
            .ok_or_else(|| PeepError::validation(format!("unknown category '{id}'")))?;

        let neighbor_pos = match direction {
            MoveDirection::Backward => pos.checked_sub(1),
            MoveDirection::Forward => {
                let next = pos + 1;
                (next < sorted_ids.len()).then_some(next)
            }
        };
        let Some(neighbor_pos) = neighbor_pos else {
            return Ok(());
        };

        let neighbor_id = sorted_ids[neighbor_pos].clone();
        let a = self
            .categories
            .iter()
            .position(|c| c.id == *id)
            .expect("category present");
        let b = self
            .categories
            .iter()
            .position(|c| c.id == neighbor_id)
            .expect("neighbor present");
        let tmp = self.categories[a].draw_order;
        self.categories[a].draw_order = self.categories[b].draw_order;
        self.categories[b].draw_order = tmp;
        Ok(())
    }

    /// Remove a category and every asset belonging to it.
    pub fn delete_category(&mut self, id: &str) -> PeepResult<()> {
        if self.category(id).is_none() {
            return Err(PeepError::validation(format!("unknown category '{id}'")));
        }
        self.categories.retain(|c| c.id != id);
        self.assets.retain(|a| a.category_id != id);
        Ok(())
    }

    /// Append a new asset to `category_id` with a generated unique id.
    /// The asset never becomes a default automatically.
    pub fn create_asset(
        &mut self,
        category_id: &str,
        name: &str,
        resource: &str,
    ) -> PeepResult<&Asset> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PeepError::validation("asset name must be non-empty"));
        }
        if self.category(category_id).is_none() {
            return Err(PeepError::validation(format!(
                "unknown category '{category_id}'"
            )));
        }
        let id = new_asset_id(self);
        self.assets.push(Asset {
            id,
            name: name.to_string(),
            category_id: category_id.to_string(),
            resource: resource.to_string(),
        });
        Ok(self.assets.last().expect("just pushed"))
    }

    pub fn rename_asset(&mut self, id: &str, name: &str) -> PeepResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PeepError::validation("asset name must be non-empty"));
        }
        let asset = self
            .assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PeepError::validation(format!("unknown asset '{id}'")))?;
        asset.name = name.to_string();
        Ok(())
    }

    /// Remove an asset, clearing any category default that pointed at it.
    /// Live selections referencing the asset are untouched; the compositor
    /// skips stale entries at render time.
    pub fn delete_asset(&mut self, id: &str) -> PeepResult<()> {
        if self.asset(id).is_none() {
            return Err(PeepError::validation(format!("unknown asset '{id}'")));
        }
        self.assets.retain(|a| a.id != id);
        for cat in &mut self.categories {
            if cat.default_asset_id.as_deref() == Some(id) {
                cat.default_asset_id = None;
            }
        }
        Ok(())
    }

    /// Set or clear a category's default asset. The asset must belong to
    /// the category; cross-category defaults are rejected.
    pub fn set_default_asset(
        &mut self,
        category_id: &str,
        asset_id: Option<&str>,
    ) -> PeepResult<()> {
        if self.category(category_id).is_none() {
            return Err(PeepError::validation(format!(
                "unknown category '{category_id}'"
            )));
        }
        if let Some(asset_id) = asset_id {
            let asset = self
                .asset(asset_id)
                .ok_or_else(|| PeepError::validation(format!("unknown asset '{asset_id}'")))?;
            if asset.category_id != category_id {
                return Err(PeepError::validation(format!(
                    "asset '{}' belongs to category '{}', not '{}'",
                    asset_id, asset.category_id, category_id
                )));
            }
        }
        let cat = self
            .categories
            .iter_mut()
            .find(|c| c.id == category_id)
            .expect("checked above");
        cat.default_asset_id = asset_id.map(str::to_string);
        Ok(())
    }

    /// Splice `dragged_id` out of the asset sequence and reinsert it
    /// immediately before `target_id`. Display grouping only; render order
    /// is governed solely by category draw order.
    pub fn reorder_assets(&mut self, dragged_id: &str, target_id: &str) -> PeepResult<()> {
        if dragged_id == target_id {
            return Ok(());
        }
        let source = self
            .assets
            .iter()
            .position(|a| a.id == dragged_id)
            .ok_or_else(|| PeepError::validation(format!("unknown asset '{dragged_id}'")))?;
        if !self.assets.iter().any(|a| a.id == target_id) {
            return Err(PeepError::validation(format!(
                "unknown asset '{target_id}'"
            )));
        }
        let moved = self.assets.remove(source);
        let target = self
            .assets
            .iter()
            .position(|a| a.id == target_id)
            .expect("target present after removal");
        self.assets.insert(target, moved);
        Ok(())
    }
}
