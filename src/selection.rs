//! The current character: a per-category chosen asset (or none).

use std::collections::BTreeMap;

use rand::seq::SliceRandom;

use crate::model::Registry;

/// Mapping from category id to the chosen asset id; absent means "no asset
/// selected for this layer".
///
/// A selection is session-scoped and may go stale relative to the registry.
/// Stale entries are not errors; the compositor and resolver treat them as
/// "no image". `select` deliberately does no membership validation for the
/// same reason: the render-time existence check is the single authority.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<String, String>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category_id: &str) -> Option<&str> {
        self.0.get(category_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Unconditionally overwrite the entry for `category_id`. `None` clears
    /// the layer.
    pub fn select(&mut self, category_id: &str, asset_id: Option<&str>) {
        match asset_id {
            Some(asset_id) => {
                self.0
                    .insert(category_id.to_string(), asset_id.to_string());
            }
            None => {
                self.0.remove(category_id);
            }
        }
    }

    pub fn clear(&mut self, category_id: &str) {
        self.select(category_id, None);
    }

    /// Replace the whole selection: for every category pick uniformly at
    /// random among its assets; categories with no assets get no entry.
    ///
    /// Deterministic for a fixed registry and a seeded `rng`.
    pub fn randomize_all<R: rand::Rng + ?Sized>(&mut self, registry: &Registry, rng: &mut R) {
        let mut next = BTreeMap::new();
        for cat in &registry.categories {
            let assets: Vec<&str> = registry.assets_in(&cat.id).map(|a| a.id.as_str()).collect();
            if let Some(picked) = assets.choose(rng) {
                next.insert(cat.id.clone(), picked.to_string());
            }
        }
        self.0 = next;
    }

    /// Replace the whole selection with the registry defaults. A full
    /// replace, not a merge: categories without a usable default are
    /// cleared even if previously set.
    pub fn reset_to_default(&mut self, registry: &Registry) {
        *self = resolve_defaults(registry);
    }
}

/// Compute the initial/reset selection for `registry`.
///
/// A category contributes an entry only when its default is set, the asset
/// still exists, and the asset belongs to that category. Pure and
/// idempotent.
pub fn resolve_defaults(registry: &Registry) -> Selection {
    let mut out = BTreeMap::new();
    for cat in &registry.categories {
        let Some(default_id) = &cat.default_asset_id else {
            continue;
        };
        let Some(asset) = registry.asset(default_id) else {
            continue;
        };
        if asset.category_id != cat.id {
            continue;
        }
        out.insert(cat.id.clone(), default_id.clone());
    }
    Selection(out)
}
