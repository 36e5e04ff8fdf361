//! Layer compositor: flattens a resolved selection into one raster image.
//!
//! Layer loads run in parallel, but draws are applied to the private
//! surface strictly in ascending draw order, so later layers always
//! occlude earlier ones. Any single load or decode failure fails the
//! whole render; no partial composite is ever returned.

use rayon::prelude::*;

use crate::{
    assets::{PreparedImage, ResourceResolver, decode_image},
    composite,
    error::{PeepError, PeepResult},
    model::{Asset, Registry},
    selection::Selection,
};

/// Flattened frame in row-major premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Output is `target_size x target_size` pixels; every layer is
    /// stretched to fill the full bounds.
    pub target_size: u32,
    /// Background color (straight alpha) applied before the first layer.
    /// `None` leaves the surface transparent.
    pub clear_rgba: Option<[u8; 4]>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target_size: 1000,
            clear_rgba: None,
        }
    }
}

/// The assets that will actually draw, in render order.
///
/// Walks categories in ascending draw order and resolves each one's
/// selection against the registry; absent entries and stale ids (asset
/// deleted since the selection was made) are skipped, never errors.
pub fn resolved_layers<'a>(registry: &'a Registry, selection: &Selection) -> Vec<&'a Asset> {
    registry
        .sorted_categories()
        .into_iter()
        .filter_map(|cat| selection.get(&cat.id))
        .filter_map(|asset_id| registry.asset(asset_id))
        .collect()
}

/// Rasterize the selected stack into a single flattened frame.
#[tracing::instrument(skip(registry, selection, resolver, opts), fields(target_size = opts.target_size))]
pub fn render_portrait(
    registry: &Registry,
    selection: &Selection,
    resolver: &dyn ResourceResolver,
    opts: &RenderOptions,
) -> PeepResult<FrameRGBA> {
    let size = opts.target_size;
    if size == 0 {
        return Err(PeepError::validation("target_size must be > 0"));
    }

    let layers = resolved_layers(registry, selection);
    tracing::debug!(layers = layers.len(), "rendering portrait");

    // Prefetch and decode every layer concurrently; collect preserves
    // layer order, so draws below stay strictly ordered.
    let prepared: Vec<PeepResult<PreparedImage>> = layers
        .par_iter()
        .map(|asset| load_layer(resolver, asset, size))
        .collect();

    let mut data = vec![0u8; (size as usize) * (size as usize) * 4];
    if let Some(clear) = opts.clear_rgba {
        let premul = premultiply_px(clear);
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&premul);
        }
    }

    for (asset, prepared) in layers.iter().zip(prepared) {
        let image = prepared.map_err(|e| layer_error(asset, e))?;
        composite::over_in_place(&mut data, &image.rgba8_premul)?;
    }

    Ok(FrameRGBA {
        width: size,
        height: size,
        data,
    })
}

/// Encode a rendered frame as PNG bytes (straight alpha).
pub fn encode_png(frame: &FrameRGBA) -> PeepResult<Vec<u8>> {
    let mut straight = frame.data.clone();
    unpremultiply_rgba8_in_place(&mut straight);

    let img = image::RgbaImage::from_raw(frame.width, frame.height, straight)
        .ok_or_else(|| PeepError::render("frame buffer does not match its dimensions"))?;

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| PeepError::render(format!("encode png: {e}")))?;
    Ok(out)
}

fn load_layer(
    resolver: &dyn ResourceResolver,
    asset: &Asset,
    target_size: u32,
) -> PeepResult<PreparedImage> {
    let bytes = resolver.fetch(&asset.resource)?;
    let image = decode_image(&bytes)?;
    Ok(scale_to_fill(image, target_size))
}

/// Stretch a decoded layer to fill the full target bounds.
///
/// Interpolation happens on premultiplied pixels, which keeps edge alpha
/// correct under linear filtering.
fn scale_to_fill(image: PreparedImage, target_size: u32) -> PreparedImage {
    if image.width == target_size && image.height == target_size {
        return image;
    }
    let buf = image::RgbaImage::from_raw(image.width, image.height, image.rgba8_premul)
        .expect("prepared image buffer matches its dimensions");
    let resized = image::imageops::resize(
        &buf,
        target_size,
        target_size,
        image::imageops::FilterType::Triangle,
    );
    PreparedImage {
        width: target_size,
        height: target_size,
        rgba8_premul: resized.into_raw(),
    }
}

fn layer_error(asset: &Asset, err: PeepError) -> PeepError {
    match err {
        PeepError::Render(msg) => PeepError::render(format!("layer '{}': {msg}", asset.id)),
        other => other,
    }
}

fn premultiply_px(px: [u8; 4]) -> [u8; 4] {
    let a = px[3] as u16;
    let mul = |c: u8| ((c as u16 * a + 127) / 255) as u8;
    [mul(px[0]), mul(px[1]), mul(px[2]), px[3]]
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
