//! Device-free inspection commands: the mode table, synthesized programs,
//! and per-frame command plans.

use std::fs;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use stereo::{
    validate_fragment, Command, Eye, Mode, ProgramTemplate, RecordingBackend, RenderState,
    RequiredEyes, Session, Viewport,
};

use crate::cli::{ModesArgs, PlanArgs, ShaderArgs};
use crate::run::ActiveProfile;

pub fn list_modes(args: &ModesArgs) -> Result<()> {
    if args.json {
        let modes: Vec<Value> = Mode::ALL
            .iter()
            .map(|mode| {
                json!({
                    "id": mode.id(),
                    "name": mode.name(),
                    "family": mode.family().to_string(),
                    "eyes": eyes_label(mode.required_eyes()),
                    "mask": mode.mask().map(|pattern| format!("{pattern:?}").to_lowercase()),
                    "shader_token": mode.shader_token(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&modes)?);
        return Ok(());
    }

    println!("{:>3}  {:<28} {:<12} eyes", "id", "name", "family");
    for mode in Mode::ALL {
        println!(
            "{:>3}  {:<28} {:<12} {}",
            mode.id(),
            mode.name(),
            mode.family().to_string(),
            eyes_label(mode.required_eyes())
        );
    }
    Ok(())
}

fn eyes_label(eyes: RequiredEyes) -> String {
    match eyes {
        RequiredEyes::Both => "both".to_string(),
        RequiredEyes::Only(eye) => eye.to_string(),
        RequiredEyes::Alternating => "alternating".to_string(),
    }
}

pub fn print_shader(args: &ShaderArgs, active: &ActiveProfile) -> Result<()> {
    let mode = active.mode_or(args.mode)?;
    let ghostbust = args.ghostbust || active.profile.ghostbust_enabled();
    let template = match &args.template {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read template {}", path.display()))?;
            ProgramTemplate::custom(source)
                .with_context(|| format!("invalid template {}", path.display()))?
        }
        None => ProgramTemplate::builtin(),
    };

    let source = template.instantiate(mode, ghostbust);
    if args.check {
        validate_fragment(&source)
            .with_context(|| format!("program for {mode} does not validate"))?;
        println!("{mode}: ok");
    } else {
        print!("{source}");
    }
    Ok(())
}

/// Commands issued for one frame, as recorded without a device.
#[derive(Debug)]
pub struct Plan {
    pub mode: Mode,
    pub frame: u64,
    pub viewport: Viewport,
    pub commands: Vec<Command>,
}

pub fn plan_frame(args: &PlanArgs, active: &ActiveProfile) -> Result<Plan> {
    let mode = active.mode_or(args.mode)?;
    let viewport = args.viewport;
    let framebuffer_width = viewport.x.max(0).unsigned_abs() + viewport.width;
    let framebuffer_height = viewport.y.max(0).unsigned_abs() + viewport.height;
    let backend = RecordingBackend::new(framebuffer_width, framebuffer_height).with_state(
        RenderState {
            viewport,
            ..RenderState::default()
        },
    );

    let mut settings = active.session_settings();
    if let Some(origin) = args.origin {
        settings.screen_origin = origin;
    }
    let swap = args.swap || active.profile.swap_eyes;

    let mut session = Session::with_settings(backend, settings);
    let frame = args.frame;
    session.set_vsync_counter(Some(Box::new(move || Some(frame))));
    session.begin_frame();

    for eye in Eye::BOTH {
        if session.is_view_required(mode, swap, eye) {
            session
                .submit_view(eye)
                .with_context(|| format!("failed to capture the {eye} view"))?;
        }
    }
    session
        .draw_submitted_views(mode, swap)
        .with_context(|| format!("failed to composite {mode}"))?;
    if args.marker {
        session.draw_sync_marker(mode)?;
    }

    let commands = session.backend_mut().take_commands();
    Ok(Plan {
        mode,
        frame: session.frame_counter(),
        viewport,
        commands,
    })
}

pub fn print_plan(args: &PlanArgs, active: &ActiveProfile) -> Result<()> {
    let plan = plan_frame(args, active)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
        return Ok(());
    }

    println!(
        "# {} ({}) viewport {} frame {}",
        plan.mode,
        plan.mode.family(),
        plan.viewport,
        plan.frame
    );
    for command in &plan.commands {
        println!("{command}");
    }
    Ok(())
}

fn viewport_json(viewport: Viewport) -> Value {
    json!({
        "x": viewport.x,
        "y": viewport.y,
        "width": viewport.width,
        "height": viewport.height,
    })
}

fn plan_json(plan: &Plan) -> Value {
    let draws: Vec<Value> = plan
        .commands
        .iter()
        .filter_map(|command| match command {
            Command::Draw { state, params } => Some(json!({
                "viewport": viewport_json(state.viewport),
                "draw_buffer": state.draw_buffer.name(),
                "channel": params.channel,
                "crosstalk": params.crosstalk,
                "mask_step": params.mask_step,
            })),
            _ => None,
        })
        .collect();
    let marker_rows: Vec<Value> = plan
        .commands
        .iter()
        .filter_map(|command| match command {
            Command::WriteRow { row, pixels } => Some(json!({
                "row": row,
                "color": format!("#{:06x}", pixels.first().copied().unwrap_or_default()),
            })),
            _ => None,
        })
        .collect();

    json!({
        "mode": plan.mode.name(),
        "family": plan.mode.family().to_string(),
        "frame": plan.frame,
        "viewport": viewport_json(plan.viewport),
        "draws": draws,
        "marker_rows": marker_rows,
        "commands": plan.commands.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}
