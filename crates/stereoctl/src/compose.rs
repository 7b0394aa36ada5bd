use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::RgbaImage;
use stereo::{
    Backend, DrawBuffer, Eye, GpuContext, GpuPowerPreference, Mode, Session, Viewport,
    WgpuBackend,
};
use tracing::info;

use crate::cli::ComposeArgs;
use crate::run::ActiveProfile;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub fn run(args: &ComposeArgs, active: &ActiveProfile) -> Result<()> {
    let mode = active.mode_or(args.mode)?;
    let swap = args.swap || active.profile.swap_eyes;

    let left = load_image(&args.left)?;
    let right = load_image(&args.right)?;
    if left.dimensions() != right.dimensions() {
        bail!(
            "left image is {}x{} but right image is {}x{}",
            left.width(),
            left.height(),
            right.width(),
            right.height()
        );
    }
    let (width, height) = left.dimensions();

    let power = if args.high_power {
        GpuPowerPreference::High
    } else {
        GpuPowerPreference::Low
    };
    let context = GpuContext::headless_with(power).context("failed to initialise a GPU device")?;
    info!(
        adapter = %context.adapter_name,
        backend = ?context.backend,
        %mode,
        width,
        height,
        "compositing"
    );

    let mut backend = WgpuBackend::from_context(&context, TARGET_FORMAT);
    let scene = backend.create_target_texture(width, height)?;
    let output = backend.create_target_texture(width, height)?;
    let output_right = if mode == Mode::QuadBuffer {
        Some(backend.create_target_texture(width, height)?)
    } else {
        None
    };
    backend.set_read_target(Some(scene))?;
    backend.set_draw_target(DrawBuffer::Back, Some(output))?;
    if let Some(texture) = output_right {
        backend.set_draw_target(DrawBuffer::BackRight, Some(texture))?;
    }
    backend.set_viewport(Viewport::full(width, height));

    let mut session = Session::with_settings(backend, active.session_settings());
    let frame = args.frame;
    session.set_vsync_counter(Some(Box::new(move || Some(frame))));
    session.begin_frame();

    for (eye, image) in Eye::BOTH.into_iter().zip([&left, &right]) {
        if !session.is_view_required(mode, swap, eye) {
            continue;
        }
        session.backend_mut().upload(scene, image.as_raw())?;
        session
            .submit_view(eye)
            .with_context(|| format!("failed to capture the {eye} view"))?;
    }
    session
        .draw_submitted_views(mode, swap)
        .with_context(|| format!("failed to composite {mode}"))?;
    if args.marker && !session.draw_sync_marker(mode)? {
        tracing::warn!(%mode, "mode has no sync marker; none drawn");
    }

    let pixels = session.backend_mut().read_texture(output)?;
    save_image(&args.output, width, height, pixels)?;
    if let Some(texture) = output_right {
        let pixels = session.backend_mut().read_texture(texture)?;
        save_image(&right_output_path(&args.output), width, height, pixels)?;
    }
    Ok(())
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    let image =
        image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    Ok(image.to_rgba8())
}

fn save_image(path: &Path, width: u32, height: u32, pixels: Vec<u8>) -> Result<()> {
    let image = RgbaImage::from_raw(width, height, pixels)
        .context("read back fewer pixels than the output holds")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote composite");
    Ok(())
}

/// `out.png` becomes `out-right.png`.
fn right_output_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(extension) => format!("{stem}-right.{}", extension.to_string_lossy()),
        None => format!("{stem}-right"),
    };
    path.with_file_name(name)
}
