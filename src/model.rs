use std::collections::HashSet;

use crate::error::{PeepError, PeepResult};

/// A named, orderable layer slot in the avatar stack (e.g. "Hair").
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Layers render in ascending order; lower values sit farther back.
    pub draw_order: i32,
    /// Asset this category falls back to on reset/initial load. Must point
    /// at an asset of this category, or be cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_asset_id: Option<String>,
}

/// A single selectable image belonging to exactly one category.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub category_id: String,
    /// Opaque displayable reference: a relative path or an inline `data:`
    /// URL. Never decoded outside the rasterizer.
    pub resource: String,
}

/// The combined set of categories and assets plus their relationships.
///
/// Vec order is insertion order: it is the stable tie-break for equal
/// `draw_order` values and the display grouping order for assets.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub categories: Vec<Category>,
    pub assets: Vec<Asset>,
}

impl Registry {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Assets belonging to `category_id`, in display (insertion) order.
    pub fn assets_in<'a>(&'a self, category_id: &'a str) -> impl Iterator<Item = &'a Asset> {
        self.assets
            .iter()
            .filter(move |a| a.category_id == category_id)
    }

    /// Categories in render order: ascending `draw_order`, ties broken by
    /// original sequence position (`sort_by_key` is stable).
    pub fn sorted_categories(&self) -> Vec<&Category> {
        let mut sorted: Vec<&Category> = self.categories.iter().collect();
        sorted.sort_by_key(|c| c.draw_order);
        sorted
    }

    pub fn max_draw_order(&self) -> i32 {
        self.categories
            .iter()
            .map(|c| c.draw_order)
            .max()
            .unwrap_or(0)
            .max(0)
    }

    pub fn validate(&self) -> PeepResult<()> {
        let mut category_ids = HashSet::new();
        for cat in &self.categories {
            if !category_ids.insert(cat.id.as_str()) {
                return Err(PeepError::validation(format!(
                    "duplicate category id '{}'",
                    cat.id
                )));
            }
        }

        let mut asset_ids = HashSet::new();
        for asset in &self.assets {
            if !asset_ids.insert(asset.id.as_str()) {
                return Err(PeepError::validation(format!(
                    "duplicate asset id '{}'",
                    asset.id
                )));
            }
            if !category_ids.contains(asset.category_id.as_str()) {
                return Err(PeepError::validation(format!(
                    "asset '{}' references missing category '{}'",
                    asset.id, asset.category_id
                )));
            }
        }

        for cat in &self.categories {
            let Some(default_id) = &cat.default_asset_id else {
                continue;
            };
            let Some(asset) = self.asset(default_id) else {
                return Err(PeepError::validation(format!(
                    "category '{}' default references missing asset '{}'",
                    cat.id, default_id
                )));
            };
            if asset.category_id != cat.id {
                return Err(PeepError::validation(format!(
                    "category '{}' default asset '{}' belongs to category '{}'",
                    cat.id, default_id, asset.category_id
                )));
            }
        }

        Ok(())
    }

    /// The stock nine-layer stack every fresh library starts from.
    pub fn starter() -> Self {
        let layer = |id: &str, name: &str, draw_order: i32| Category {
            id: id.to_string(),
            name: name.to_string(),
            draw_order,
            default_asset_id: None,
        };
        Self {
            categories: vec![
                layer("background", "Background", 0),
                layer("body", "Body", 10),
                layer("skin", "Skin", 20),
                layer("clothing", "Clothing", 30),
                layer("face", "Face", 40),
                layer("hair", "Hair", 50),
                layer("hand", "Hand", 55),
                layer("glasses", "Glasses", 60),
                layer("accessories", "Accessories", 70),
            ],
            assets: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_registry() -> Registry {
        Registry {
            categories: vec![
                Category {
                    id: "background".to_string(),
                    name: "Background".to_string(),
                    draw_order: 0,
                    default_asset_id: Some("bg-1".to_string()),
                },
                Category {
                    id: "body".to_string(),
                    name: "Body".to_string(),
                    draw_order: 10,
                    default_asset_id: None,
                },
            ],
            assets: vec![
                Asset {
                    id: "bg-1".to_string(),
                    name: "Blue Sky".to_string(),
                    category_id: "background".to_string(),
                    resource: "backgrounds/sky.png".to_string(),
                },
                Asset {
                    id: "body-1".to_string(),
                    name: "Standard Body".to_string(),
                    category_id: "body".to_string(),
                    resource: "bodies/standard.png".to_string(),
                },
            ],
        }
    }

    #[test]
    fn json_roundtrip_uses_camel_case() {
        let reg = basic_registry();
        let s = serde_json::to_string_pretty(&reg).unwrap();
        assert!(s.contains("\"drawOrder\""));
        assert!(s.contains("\"defaultAssetId\""));
        assert!(s.contains("\"categoryId\""));

        let de: Registry = serde_json::from_str(&s).unwrap();
        assert_eq!(de.categories.len(), 2);
        assert_eq!(de.assets.len(), 2);
        assert_eq!(
            de.category("background").unwrap().default_asset_id.as_deref(),
            Some("bg-1")
        );
    }

    #[test]
    fn default_asset_id_omitted_when_unset() {
        let reg = basic_registry();
        let v: serde_json::Value = serde_json::to_value(&reg).unwrap();
        assert!(v["categories"][1].get("defaultAssetId").is_none());
    }

    #[test]
    fn validate_accepts_basic_registry() {
        basic_registry().validate().unwrap();
    }

    #[test]
    fn validate_rejects_duplicate_category_id() {
        let mut reg = basic_registry();
        let dup = reg.categories[0].clone();
        reg.categories.push(dup);
        assert!(reg.validate().is_err());
    }

    #[test]
    fn validate_rejects_orphaned_asset() {
        let mut reg = basic_registry();
        reg.assets[0].category_id = "missing".to_string();
        assert!(reg.validate().is_err());
    }

    #[test]
    fn validate_rejects_dangling_default() {
        let mut reg = basic_registry();
        reg.categories[0].default_asset_id = Some("gone".to_string());
        assert!(reg.validate().is_err());
    }

    #[test]
    fn validate_rejects_cross_category_default() {
        let mut reg = basic_registry();
        reg.categories[0].default_asset_id = Some("body-1".to_string());
        assert!(reg.validate().is_err());
    }

    #[test]
    fn sorted_categories_breaks_ties_by_insertion_order() {
        let mut reg = basic_registry();
        reg.categories.push(Category {
            id: "overlay".to_string(),
            name: "Overlay".to_string(),
            draw_order: 0,
            default_asset_id: None,
        });
        let order: Vec<&str> = reg
            .sorted_categories()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(order, vec!["background", "overlay", "body"]);
    }

    #[test]
    fn starter_registry_is_valid_and_ordered() {
        let reg = Registry::starter();
        reg.validate().unwrap();
        let orders: Vec<i32> = reg
            .sorted_categories()
            .iter()
            .map(|c| c.draw_order)
            .collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
        assert!(reg.assets.is_empty());
    }
}
