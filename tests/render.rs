use std::collections::HashMap;
use std::io::Cursor;

use peepstack::{
    Asset, Category, PeepError, PeepResult, Registry, RenderOptions, ResourceResolver, Selection,
    encode_png, render_portrait,
};

struct MemResolver(HashMap<String, Vec<u8>>);

impl ResourceResolver for MemResolver {
    fn fetch(&self, resource: &str) -> PeepResult<Vec<u8>> {
        self.0
            .get(resource)
            .cloned()
            .ok_or_else(|| PeepError::render(format!("unknown resource '{resource}'")))
    }
}

fn png_from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> Vec<u8> {
    let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
    let img = image::RgbaImage::from_raw(width, height, raw).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn category(id: &str, draw_order: i32) -> Category {
    Category {
        id: id.to_string(),
        name: id.to_string(),
        draw_order,
        default_asset_id: None,
    }
}

fn asset(id: &str, category_id: &str) -> Asset {
    Asset {
        id: id.to_string(),
        name: id.to_string(),
        category_id: category_id.to_string(),
        resource: format!("{id}.png"),
    }
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

/// Categories inserted as [a(10), b(30), c(20)]: render order must be
/// a, c, b regardless of insertion or iteration order.
fn layered_registry() -> (Registry, MemResolver) {
    let reg = Registry {
        categories: vec![category("a", 10), category("b", 30), category("c", 20)],
        assets: vec![asset("a-1", "a"), asset("b-1", "b"), asset("c-1", "c")],
    };

    let mut resources = HashMap::new();
    // a: opaque red everywhere.
    resources.insert("a-1.png".to_string(), png_from_pixels(2, 2, &[RED; 4]));
    // c: green left column.
    resources.insert(
        "c-1.png".to_string(),
        png_from_pixels(2, 2, &[GREEN, CLEAR, GREEN, CLEAR]),
    );
    // b: blue top-left pixel only.
    resources.insert(
        "b-1.png".to_string(),
        png_from_pixels(2, 2, &[BLUE, CLEAR, CLEAR, CLEAR]),
    );

    (reg, MemResolver(resources))
}

fn full_selection() -> Selection {
    let mut sel = Selection::new();
    sel.select("a", Some("a-1"));
    sel.select("b", Some("b-1"));
    sel.select("c", Some("c-1"));
    sel
}

fn pixel(frame: &peepstack::FrameRGBA, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * frame.width + x) * 4) as usize;
    [
        frame.data[i],
        frame.data[i + 1],
        frame.data[i + 2],
        frame.data[i + 3],
    ]
}

#[test]
fn draw_order_is_ascending_with_later_layers_occluding() {
    let (reg, resolver) = layered_registry();
    let opts = RenderOptions {
        target_size: 2,
        clear_rgba: None,
    };
    let frame = render_portrait(&reg, &full_selection(), &resolver, &opts).unwrap();

    // a (10) under c (20) under b (30).
    assert_eq!(pixel(&frame, 0, 0), BLUE);
    assert_eq!(pixel(&frame, 1, 0), RED);
    assert_eq!(pixel(&frame, 0, 1), GREEN);
    assert_eq!(pixel(&frame, 1, 1), RED);
}

#[test]
fn render_is_deterministic() {
    let (reg, resolver) = layered_registry();
    let opts = RenderOptions {
        target_size: 2,
        clear_rgba: None,
    };
    let sel = full_selection();
    let one = render_portrait(&reg, &sel, &resolver, &opts).unwrap();
    let two = render_portrait(&reg, &sel, &resolver, &opts).unwrap();
    assert_eq!(one.data, two.data);
}

#[test]
fn stale_selection_skips_the_layer() {
    let (reg, resolver) = layered_registry();
    let mut sel = Selection::new();
    sel.select("a", Some("deleted-asset"));
    sel.select("c", Some("c-1"));

    let opts = RenderOptions {
        target_size: 2,
        clear_rgba: None,
    };
    let frame = render_portrait(&reg, &sel, &resolver, &opts).unwrap();

    // The stale background never drew; only c's green column is present.
    assert_eq!(pixel(&frame, 0, 0), GREEN);
    assert_eq!(pixel(&frame, 1, 0), CLEAR);
}

#[test]
fn one_failing_load_fails_the_whole_render() {
    let (mut reg, resolver) = layered_registry();
    reg.assets.push(asset("broken", "b"));
    let mut sel = full_selection();
    sel.select("b", Some("broken"));

    let opts = RenderOptions {
        target_size: 2,
        clear_rgba: None,
    };
    let err = render_portrait(&reg, &sel, &resolver, &opts).unwrap_err();
    assert!(err.to_string().contains("broken"));
}

#[test]
fn corrupt_image_bytes_fail_the_whole_render() {
    let (reg, mut resolver) = layered_registry();
    resolver
        .0
        .insert("c-1.png".to_string(), b"not a png".to_vec());

    let opts = RenderOptions {
        target_size: 2,
        clear_rgba: None,
    };
    let err = render_portrait(&reg, &full_selection(), &resolver, &opts).unwrap_err();
    assert!(err.to_string().contains("c-1"));
}

#[test]
fn empty_selection_renders_background_color_only() {
    let (reg, resolver) = layered_registry();
    let opts = RenderOptions {
        target_size: 2,
        clear_rgba: Some([7, 8, 9, 255]),
    };
    let frame = render_portrait(&reg, &Selection::new(), &resolver, &opts).unwrap();
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(pixel(&frame, x, y), [7, 8, 9, 255]);
        }
    }
}

#[test]
fn layers_stretch_to_fill_the_target() {
    let reg = Registry {
        categories: vec![category("bg", 0)],
        assets: vec![asset("dot", "bg")],
    };
    let mut resources = HashMap::new();
    resources.insert("dot.png".to_string(), png_from_pixels(1, 1, &[RED]));
    let resolver = MemResolver(resources);

    let mut sel = Selection::new();
    sel.select("bg", Some("dot"));

    let opts = RenderOptions {
        target_size: 4,
        clear_rgba: None,
    };
    let frame = render_portrait(&reg, &sel, &resolver, &opts).unwrap();
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(pixel(&frame, x, y), RED);
        }
    }
}

#[test]
fn encode_png_roundtrips_through_image() {
    let (reg, resolver) = layered_registry();
    let opts = RenderOptions {
        target_size: 2,
        clear_rgba: None,
    };
    let frame = render_portrait(&reg, &full_selection(), &resolver, &opts).unwrap();
    let png = encode_png(&frame).unwrap();

    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (2, 2));
    assert_eq!(decoded.get_pixel(0, 0).0, BLUE);
    assert_eq!(decoded.get_pixel(1, 1).0, RED);
}
