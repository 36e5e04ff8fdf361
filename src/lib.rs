#![forbid(unsafe_code)]

pub mod assets;
pub mod composite;
pub mod error;
pub mod model;
pub mod mutate;
pub mod render;
pub mod selection;
pub mod session;
pub mod store;

pub use assets::{FsResolver, PreparedImage, ResourceResolver};
pub use error::{PeepError, PeepResult};
pub use model::{Asset, Category, Registry};
pub use mutate::{MoveDirection, slugify};
pub use render::{FrameRGBA, RenderOptions, encode_png, render_portrait, resolved_layers};
pub use selection::{Selection, resolve_defaults};
pub use session::Session;
pub use store::{JsonFileStore, ReadOnlyGate, RegistryStore, WritableGate, WriteGate};
