//! Compositing on a real device. Every test returns early when the machine has
//! no adapter.

use stereo::{Backend, DrawBuffer, Eye, GpuContext, Mode, Session, Viewport, WgpuBackend};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const CYAN: [u8; 4] = [0, 255, 255, 255];

fn context() -> Option<GpuContext> {
    match GpuContext::headless() {
        Ok(context) => Some(context),
        Err(err) => {
            eprintln!("no GPU adapter, skipping: {err}");
            None
        }
    }
}

/// Read-back pixels, top row first.
struct Frame {
    width: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// `y` counts from the top of the texture.
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        let mut texel = [0; 4];
        texel.copy_from_slice(&self.pixels[offset..offset + 4]);
        texel
    }

    fn row(&self, y: u32) -> Vec<[u8; 4]> {
        (0..self.width).map(|x| self.pixel(x, y)).collect()
    }
}

fn solid(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    color.repeat((width * height) as usize)
}

/// Composes a solid red left view and a solid blue right view at frame 1.
fn compose(context: &GpuContext, mode: Mode, width: u32, height: u32, marker: bool) -> Frame {
    let mut backend = WgpuBackend::from_context(context, FORMAT);
    let scene = backend.create_target_texture(width, height).unwrap();
    let output = backend.create_target_texture(width, height).unwrap();
    backend.set_read_target(Some(scene)).unwrap();
    backend.set_draw_target(DrawBuffer::Back, Some(output)).unwrap();
    backend.set_viewport(Viewport::full(width, height));

    let mut session = Session::new(backend);
    session.set_vsync_counter(Some(Box::new(|| Some(1))));
    session.begin_frame();
    for (eye, color) in [(Eye::Left, RED), (Eye::Right, BLUE)] {
        session
            .backend_mut()
            .upload(scene, &solid(width, height, color))
            .unwrap();
        session.submit_view(eye).unwrap();
    }
    session.draw_submitted_views(mode, false).unwrap();
    if marker {
        assert!(session.draw_sync_marker(mode).unwrap());
    }

    Frame {
        width,
        pixels: session.backend_mut().read_texture(output).unwrap(),
    }
}

#[test]
fn even_odd_rows_alternate_views_by_row() {
    let Some(context) = context() else { return };
    let frame = compose(&context, Mode::EvenOddRows, 4, 4, false);

    for y in 0..4 {
        let row = frame.row(y);
        assert!(row[0] == RED || row[0] == BLUE, "row {y}: {:?}", row[0]);
        assert!(row.iter().all(|texel| *texel == row[0]), "row {y}: {row:?}");
    }
    assert_ne!(frame.pixel(0, 0), frame.pixel(0, 1));
    assert_eq!(frame.pixel(0, 0), frame.pixel(0, 2));
    assert_eq!(frame.pixel(0, 1), frame.pixel(0, 3));
}

#[test]
fn checkerboard_alternates_views_in_both_directions() {
    let Some(context) = context() else { return };
    let frame = compose(&context, Mode::Checkerboard, 4, 4, false);

    for y in 0..4 {
        for x in 0..4 {
            let texel = frame.pixel(x, y);
            assert!(texel == RED || texel == BLUE, "({x}, {y}): {texel:?}");
        }
    }
    assert_ne!(frame.pixel(0, 0), frame.pixel(1, 0));
    assert_ne!(frame.pixel(0, 0), frame.pixel(0, 1));
    assert_eq!(frame.pixel(0, 0), frame.pixel(1, 1));
    assert_eq!(frame.pixel(1, 0), frame.pixel(0, 1));
}

#[test]
fn left_right_halves_carry_a_bottom_sync_marker() {
    let Some(context) = context() else { return };
    let frame = compose(&context, Mode::LeftRight, 8, 4, true);

    for y in 0..3 {
        assert_eq!(frame.pixel(0, y), RED, "row {y}");
        assert_eq!(frame.pixel(3, y), RED, "row {y}");
        assert_eq!(frame.pixel(4, y), BLUE, "row {y}");
        assert_eq!(frame.pixel(7, y), BLUE, "row {y}");
    }
    // odd frame: cyan across the whole bottom scanline
    assert!(frame.row(3).iter().all(|texel| *texel == CYAN), "{:?}", frame.row(3));
}

#[test]
fn views_are_captured_from_the_bottom_left() {
    let Some(context) = context() else { return };
    let (width, height) = (4, 4);
    let mut backend = WgpuBackend::from_context(&context, FORMAT);
    let scene = backend.create_target_texture(width, height).unwrap();
    let output = backend.create_target_texture(width, height).unwrap();
    backend.set_read_target(Some(scene)).unwrap();
    backend.set_draw_target(DrawBuffer::Back, Some(output)).unwrap();
    // bottom half of the framebuffer
    backend.set_viewport(Viewport::new(0, 0, width, height / 2));

    // top half green, bottom half red
    let mut pixels = solid(width, height / 2, GREEN);
    pixels.extend(solid(width, height / 2, RED));
    backend.upload(scene, &pixels).unwrap();

    let mut session = Session::new(backend);
    session.begin_frame();
    session.submit_view(Eye::Left).unwrap();
    session.draw_submitted_views(Mode::MonoLeft, false).unwrap();
    let frame = Frame {
        width,
        pixels: session.backend_mut().read_texture(output).unwrap(),
    };

    for y in 2..4 {
        assert!(frame.row(y).iter().all(|texel| *texel == RED), "row {y}: {:?}", frame.row(y));
    }
    for y in 0..2 {
        assert!(frame.row(y).iter().all(|texel| *texel != RED), "row {y}: {:?}", frame.row(y));
    }
}
