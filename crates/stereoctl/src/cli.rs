use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stereo::{Mode, Viewport};

#[derive(Parser, Debug)]
#[command(
    name = "stereoctl",
    author,
    version,
    about = "Inspect and exercise the stereo compositor"
)]
pub struct Cli {
    /// Display profile (TOML). Defaults to `profile.toml` in the stereoctl
    /// config directory when that file exists.
    #[arg(long, global = true, env = "STEREOCTL_PROFILE", value_name = "PATH")]
    pub profile: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every output mode with its id, family, and required eyes.
    Modes(ModesArgs),
    /// Print the fragment program synthesized for one mode.
    Shader(ShaderArgs),
    /// Show the commands the compositor issues for one frame.
    Plan(PlanArgs),
    /// Print both eyes' projection matrices for a symmetric perspective.
    Frustum(FrustumArgs),
    /// Print both eyes' view matrices.
    LookAt(LookAtArgs),
    /// Composite two images on the GPU and write the result as an image.
    Compose(ComposeArgs),
    /// Validate and locate display profiles.
    Profile(ProfileCommand),
}

#[derive(Args, Debug, Default)]
pub struct ModesArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShaderArgs {
    /// Mode name or numeric id; falls back to the profile's mode.
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<Mode>,
    /// Select the ghostbusting variant (also implied by the profile).
    #[arg(long)]
    pub ghostbust: bool,
    /// Use a custom template instead of the built-in one.
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,
    /// Parse and validate the program instead of printing it.
    #[arg(long)]
    pub check: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<Mode>,
    /// Viewport as `X,Y,WIDTH,HEIGHT`, bottom-left origin.
    #[arg(long, value_parser = parse_viewport, default_value = "0,0,1920,1080")]
    pub viewport: Viewport,
    /// Exchange the two views.
    #[arg(long)]
    pub swap: bool,
    /// Frame counter value to plan for.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub frame: u64,
    /// Screen position of the framebuffer origin as `X,Y`.
    #[arg(long, value_parser = parse_pair)]
    pub origin: Option<(i32, i32)>,
    /// Also paint the sync marker.
    #[arg(long)]
    pub marker: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FrustumArgs {
    /// Vertical field of view in degrees.
    #[arg(long)]
    pub fovy: Option<f64>,
    #[arg(long, default_value_t = 16.0 / 9.0)]
    pub aspect: f64,
    #[arg(long)]
    pub near: Option<f64>,
    #[arg(long)]
    pub far: Option<f64>,
    /// Distance to the zero-parallax plane.
    #[arg(long)]
    pub focal_length: Option<f64>,
    #[arg(long)]
    pub eye_separation: Option<f64>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LookAtArgs {
    /// Camera position as `X,Y,Z`.
    #[arg(long, value_parser = parse_vec3, default_value = "0,0,5")]
    pub eye: [f64; 3],
    #[arg(long, value_parser = parse_vec3, default_value = "0,0,0")]
    pub center: [f64; 3],
    #[arg(long, value_parser = parse_vec3, default_value = "0,1,0")]
    pub up: [f64; 3],
    #[arg(long)]
    pub eye_separation: Option<f64>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Left-eye image.
    pub left: PathBuf,
    /// Right-eye image; must match the left image's size.
    pub right: PathBuf,
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<Mode>,
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,
    #[arg(long)]
    pub swap: bool,
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub frame: u64,
    /// Also paint the sync marker.
    #[arg(long)]
    pub marker: bool,
    /// Prefer the high-performance adapter.
    #[arg(long)]
    pub high_power: bool,
}

#[derive(Parser, Debug)]
pub struct ProfileCommand {
    #[command(subcommand)]
    pub action: ProfileAction,
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// Parse and validate a profile, then print what it resolves to.
    Check(ProfileCheckArgs),
    /// Print where the default profile is looked up.
    Where,
}

#[derive(Args, Debug, Default)]
pub struct ProfileCheckArgs {
    /// Profile to check; defaults to the active profile.
    pub path: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_mode(value: &str) -> Result<Mode, String> {
    value
        .parse::<Mode>()
        .map_err(|err| format!("{err}; run `stereoctl modes` for the list of names"))
}

fn split_numbers<T: std::str::FromStr>(
    value: &str,
    expected: usize,
    what: &str,
) -> Result<Vec<T>, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != expected {
        return Err(format!(
            "expected {expected} comma-separated values for {what}, got '{value}'"
        ));
    }
    parts
        .iter()
        .map(|part| {
            part.parse::<T>()
                .map_err(|_| format!("invalid number '{part}' in {what}"))
        })
        .collect()
}

pub fn parse_viewport(value: &str) -> Result<Viewport, String> {
    let parts = split_numbers::<i64>(value, 4, "viewport")?;
    let x = i32::try_from(parts[0]).map_err(|_| "viewport x out of range".to_string())?;
    let y = i32::try_from(parts[1]).map_err(|_| "viewport y out of range".to_string())?;
    let width =
        u32::try_from(parts[2]).map_err(|_| "viewport width must be positive".to_string())?;
    let height =
        u32::try_from(parts[3]).map_err(|_| "viewport height must be positive".to_string())?;
    if width == 0 || height == 0 {
        return Err("viewport must not be empty".to_string());
    }
    Ok(Viewport::new(x, y, width, height))
}

pub fn parse_pair(value: &str) -> Result<(i32, i32), String> {
    let parts = split_numbers::<i32>(value, 2, "origin")?;
    Ok((parts[0], parts[1]))
}

pub fn parse_vec3(value: &str) -> Result<[f64; 3], String> {
    let parts = split_numbers::<f64>(value, 3, "vector")?;
    Ok([parts[0], parts[1], parts[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_viewports() {
        assert_eq!(
            parse_viewport("10, -5, 801,600"),
            Ok(Viewport::new(10, -5, 801, 600))
        );
        assert!(parse_viewport("0,0,0,600").is_err());
        assert!(parse_viewport("0,0,-1,600").is_err());
        assert!(parse_viewport("0,0,600").is_err());
    }

    #[test]
    fn parses_modes_by_name_or_id() {
        assert_eq!(parse_mode("left-right"), Ok(Mode::LeftRight));
        assert_eq!(parse_mode("9"), Ok(Mode::Checkerboard));
        let err = parse_mode("sideways").unwrap_err();
        assert!(err.contains("stereoctl modes"));
    }

    #[test]
    fn parses_vectors() {
        assert_eq!(parse_vec3("1, 2.5, -3"), Ok([1.0, 2.5, -3.0]));
        assert!(parse_vec3("1,2").is_err());
        assert_eq!(parse_pair("300,201"), Ok((300, 201)));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
