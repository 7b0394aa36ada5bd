use anyhow::{ensure, Result};
use glam::{DMat4, DVec3};
use serde_json::json;
use stereo::{stereo_look_at, stereo_perspective, Eye};
use stereoconfig::{Camera, Profile};

use crate::cli::{FrustumArgs, LookAtArgs};

/// Profile camera with command-line overrides applied.
fn camera_for(args: &FrustumArgs, profile: &Profile) -> Result<Camera> {
    let mut camera = profile.camera;
    if let Some(fovy) = args.fovy {
        camera.fovy = fovy;
    }
    if let Some(near) = args.near {
        camera.near = near;
    }
    if let Some(far) = args.far {
        camera.far = far;
    }
    if let Some(focal_length) = args.focal_length {
        camera.focal_length = focal_length;
    }
    if args.eye_separation.is_some() {
        camera.eye_separation = args.eye_separation;
    }

    ensure!(
        camera.fovy > 0.0 && camera.fovy < 180.0,
        "fovy must be within (0, 180) degrees"
    );
    ensure!(
        camera.near > 0.0 && camera.far > camera.near,
        "near and far must satisfy 0 < near < far"
    );
    ensure!(camera.focal_length > 0.0, "focal length must be positive");
    ensure!(args.aspect > 0.0, "aspect must be positive");
    Ok(camera)
}

pub fn frustum_matrices(args: &FrustumArgs, profile: &Profile) -> Result<[DMat4; 2]> {
    let camera = camera_for(args, profile)?;
    Ok(Eye::BOTH.map(|eye| {
        stereo_perspective(
            camera.fovy,
            args.aspect,
            camera.near,
            camera.far,
            camera.focal_length,
            camera.eye_separation(),
            eye,
        )
    }))
}

pub fn print_frustum(args: &FrustumArgs, profile: &Profile) -> Result<()> {
    let matrices = frustum_matrices(args, profile)?;
    print_pair("projection", &matrices, args.json)
}

pub fn look_at_matrices(args: &LookAtArgs, profile: &Profile) -> Result<[DMat4; 2]> {
    let eye_position = DVec3::from_array(args.eye);
    let center = DVec3::from_array(args.center);
    let up = DVec3::from_array(args.up);
    let eye_separation = args
        .eye_separation
        .unwrap_or_else(|| profile.camera.eye_separation());

    let forward = center - eye_position;
    ensure!(
        forward.length_squared() > 0.0,
        "eye and center must be distinct points"
    );
    ensure!(
        forward.cross(up).length_squared() > 0.0,
        "up must not be parallel to the view direction"
    );

    Ok(Eye::BOTH.map(|eye| stereo_look_at(eye_position, center, up, eye_separation, eye)))
}

pub fn print_look_at(args: &LookAtArgs, profile: &Profile) -> Result<()> {
    let matrices = look_at_matrices(args, profile)?;
    print_pair("view", &matrices, args.json)
}

/// Row-major rows, the order the matrices are usually written down in.
fn rows(matrix: &DMat4) -> [[f64; 4]; 4] {
    matrix.transpose().to_cols_array_2d()
}

fn print_pair(kind: &str, matrices: &[DMat4; 2], as_json: bool) -> Result<()> {
    if as_json {
        let value = json!({
            "kind": kind,
            "left": rows(&matrices[0]),
            "right": rows(&matrices[1]),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (eye, matrix) in Eye::BOTH.iter().zip(matrices) {
        println!("{eye} {kind}:");
        for row in rows(matrix) {
            println!(
                "  {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
                row[0], row[1], row[2], row[3]
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum_args() -> FrustumArgs {
        FrustumArgs {
            fovy: None,
            aspect: 1.0,
            near: None,
            far: None,
            focal_length: None,
            eye_separation: None,
            json: false,
        }
    }

    #[test]
    fn eyes_shift_in_opposite_directions() {
        let [left, right] = frustum_matrices(&frustum_args(), &Profile::default()).unwrap();
        let left_shift = rows(&left)[0][2];
        let right_shift = rows(&right)[0][2];
        assert!(left_shift > 0.0);
        assert!((left_shift + right_shift).abs() < 1e-12);
    }

    #[test]
    fn zero_separation_matches_mono() {
        let mut args = frustum_args();
        args.eye_separation = Some(0.0);
        let [left, right] = frustum_matrices(&args, &Profile::default()).unwrap();
        assert_eq!(left, right);
        assert_eq!(rows(&left)[0][2], 0.0);
    }

    #[test]
    fn bad_planes_are_rejected() {
        let mut args = frustum_args();
        args.near = Some(5.0);
        args.far = Some(1.0);
        assert!(frustum_matrices(&args, &Profile::default()).is_err());
    }

    #[test]
    fn degenerate_look_at_is_rejected() {
        let args = LookAtArgs {
            eye: [0.0, 0.0, 5.0],
            center: [0.0, 0.0, 0.0],
            up: [0.0, 0.0, 1.0],
            eye_separation: None,
            json: false,
        };
        assert!(look_at_matrices(&args, &Profile::default()).is_err());
    }

    #[test]
    fn look_at_offsets_each_eye() {
        let args = LookAtArgs {
            eye: [0.0, 0.0, 5.0],
            center: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            eye_separation: Some(0.2),
            json: false,
        };
        let [left, right] = look_at_matrices(&args, &Profile::default()).unwrap();
        let left_x = left.w_axis.x;
        let right_x = right.w_axis.x;
        assert!((left_x - 0.1).abs() < 1e-12);
        assert!((right_x + 0.1).abs() < 1e-12);
    }
}
