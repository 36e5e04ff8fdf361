//! Resource resolution and image decoding.
//!
//! Asset `resource` strings stay opaque everywhere except here: the
//! compositor hands them to a [`ResourceResolver`] for bytes and decodes
//! the bytes into premultiplied RGBA8 right before drawing.

use std::path::{Path, PathBuf};

use base64::Engine as _;

use crate::error::{PeepError, PeepResult};

/// Decoded raster image in row-major premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Vec<u8>,
}

/// Resolves an opaque resource reference to displayable image bytes.
///
/// Used only by the compositor. A failed fetch fails the whole render.
pub trait ResourceResolver: Sync {
    fn fetch(&self, resource: &str) -> PeepResult<Vec<u8>>;
}

/// Filesystem resolver rooted at a directory, with built-in handling of
/// inline `data:` URLs.
#[derive(Clone, Debug)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceResolver for FsResolver {
    fn fetch(&self, resource: &str) -> PeepResult<Vec<u8>> {
        if resource.starts_with("data:") {
            return decode_data_url(resource);
        }
        let rel = normalize_rel_path(resource)?;
        let path = self.root.join(Path::new(&rel));
        std::fs::read(&path)
            .map_err(|e| PeepError::render(format!("read resource '{}': {e}", path.display())))
    }
}

/// Decode a base64 `data:` URL (`data:<mime>;base64,<payload>`).
pub fn decode_data_url(url: &str) -> PeepResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| PeepError::render("not a data: URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| PeepError::render("data: URL has no payload"))?;
    if !meta.ends_with(";base64") {
        return Err(PeepError::render("data: URL must be base64-encoded"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| PeepError::render(format!("decode data: URL payload: {e}")))
}

/// Normalize and validate a root-relative resource path.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> PeepResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(PeepError::validation("resource paths must be relative"));
    }
    if s.is_empty() {
        return Err(PeepError::validation("resource path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(PeepError::validation(
                "resource paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(PeepError::validation(
            "resource path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

pub fn decode_image(bytes: &[u8]) -> PeepResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| PeepError::render(format!("decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul,
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
