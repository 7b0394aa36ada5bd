//! Off-axis stereo projection and eye-shifted look-at transforms.
//!
//! Matrices follow the classic fixed-function conventions: right-handed eye
//! space looking down `-Z`, clip-space depth in `[-1, 1]`, column-major
//! storage. Hosts rendering with a `[0, 1]` depth range can pre-multiply their
//! usual depth remap.
//!
//! Each eye gets a frustum shifted horizontally so that both frusta converge at
//! the focal plane (zero parallax). The matching eye translation lives in the
//! look-at transform, keeping the camera at the origin of its projection.

use glam::{DMat4, DVec3, DVec4};

use crate::types::Eye;

/// Bounds of a viewing frustum at the near plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub near: f64,
    pub far: f64,
}

impl Frustum {
    /// Symmetric frustum for a vertical field of view given in degrees.
    pub fn from_perspective(fovy_degrees: f64, aspect: f64, near: f64, far: f64) -> Self {
        let top = near * (fovy_degrees.to_radians() / 2.0).tan();
        let right = top * aspect;
        Self {
            left: -right,
            right,
            bottom: -top,
            top,
            near,
            far,
        }
    }

    /// Shifts the frustum for `eye` so zero parallax lands on the focal plane.
    pub fn shifted_for(self, focal_length: f64, eye_separation: f64, eye: Eye) -> Self {
        let d = eye_separation / 2.0 * self.near / focal_length;
        let shift = match eye {
            Eye::Left => d,
            Eye::Right => -d,
        };
        Self {
            left: self.left + shift,
            right: self.right + shift,
            ..self
        }
    }

    /// The general perspective projection for these bounds.
    pub fn matrix(&self) -> DMat4 {
        let Frustum {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;
        DMat4::from_cols(
            DVec4::new(2.0 * n / (r - l), 0.0, 0.0, 0.0),
            DVec4::new(0.0, 2.0 * n / (t - b), 0.0, 0.0),
            DVec4::new((r + l) / (r - l), (t + b) / (t - b), -(f + n) / (f - n), -1.0),
            DVec4::new(0.0, 0.0, -2.0 * f * n / (f - n), 0.0),
        )
    }
}

/// Projection matrix for one eye of an off-axis stereo frustum.
#[allow(clippy::too_many_arguments)]
pub fn stereo_frustum(
    left: f64,
    right: f64,
    bottom: f64,
    top: f64,
    near: f64,
    far: f64,
    focal_length: f64,
    eye_separation: f64,
    eye: Eye,
) -> DMat4 {
    Frustum {
        left,
        right,
        bottom,
        top,
        near,
        far,
    }
    .shifted_for(focal_length, eye_separation, eye)
    .matrix()
}

/// Stereo variant of a symmetric perspective projection. `fovy` is in degrees.
pub fn stereo_perspective(
    fovy: f64,
    aspect: f64,
    near: f64,
    far: f64,
    focal_length: f64,
    eye_separation: f64,
    eye: Eye,
) -> DMat4 {
    Frustum::from_perspective(fovy, aspect, near, far)
        .shifted_for(focal_length, eye_separation, eye)
        .matrix()
}

/// View matrix for one eye: a conventional look-at whose eye position is moved
/// half the eye separation along the camera's side axis.
///
/// A zero-length view direction, or an `up` parallel to it, yields NaNs.
pub fn stereo_look_at(
    eye_position: DVec3,
    center: DVec3,
    up: DVec3,
    eye_separation: f64,
    eye: Eye,
) -> DMat4 {
    let forward = (center - eye_position).normalize();
    let side = forward.cross(up).normalize();
    let true_up = side.cross(forward);

    let rotation = DMat4::from_cols(
        DVec4::new(side.x, true_up.x, -forward.x, 0.0),
        DVec4::new(side.y, true_up.y, -forward.y, 0.0),
        DVec4::new(side.z, true_up.z, -forward.z, 0.0),
        DVec4::W,
    );

    let half = eye_separation / 2.0;
    let shifted = match eye {
        Eye::Left => eye_position - side * half,
        Eye::Right => eye_position + side * half,
    };
    rotation * DMat4::from_translation(-shifted)
}
