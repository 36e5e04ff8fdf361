//! A configurator session: the working registry plus the current
//! character, with fire-and-forget persistence.

use crate::{
    error::PeepResult,
    model::Registry,
    render::{FrameRGBA, RenderOptions, render_portrait},
    selection::{Selection, resolve_defaults},
    store::RegistryStore,
};

/// Owns the in-memory registry and selection for one editing session.
///
/// Mutations apply to memory first, then persist asynchronously from the
/// caller's point of view: a persistence failure is logged and the edit is
/// kept (no rollback). The store is never consulted again after load, so
/// in-memory operations work with the collaborator unavailable.
pub struct Session {
    registry: Registry,
    selection: Selection,
    store: Box<dyn RegistryStore>,
}

impl Session {
    /// Load working state from the store. Load failure is treated the same
    /// as empty data: the session starts with no categories and no assets.
    /// The selection starts from the registry defaults.
    pub fn load(store: Box<dyn RegistryStore>) -> Self {
        let registry = match store.load() {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!(error = %e, "registry load failed, starting empty");
                Registry::default()
            }
        };
        let selection = resolve_defaults(&registry);
        Self {
            registry,
            selection,
            store,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select(&mut self, category_id: &str, asset_id: Option<&str>) {
        self.selection.select(category_id, asset_id);
    }

    pub fn randomize_all<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.selection.randomize_all(&self.registry, rng);
    }

    pub fn reset_to_default(&mut self) {
        self.selection.reset_to_default(&self.registry);
    }

    /// Apply a library mutation to the in-memory registry, then persist.
    ///
    /// The mutation's own validation error aborts before anything is
    /// written. A persist failure does not roll the edit back.
    pub fn mutate<T>(&mut self, op: impl FnOnce(&mut Registry) -> PeepResult<T>) -> PeepResult<T> {
        let out = op(&mut self.registry)?;
        if let Err(e) = self.store.persist(&self.registry) {
            tracing::warn!(error = %e, "persist failed, keeping in-memory state");
        }
        Ok(out)
    }

    pub fn render(
        &self,
        resolver: &dyn crate::assets::ResourceResolver,
        opts: &RenderOptions,
    ) -> PeepResult<FrameRGBA> {
        render_portrait(&self.registry, &self.selection, resolver, opts)
    }
}
