//! Local transforms: position, XYZ-order Euler rotation, scale.
//!
//! Rotation is stored as Euler angles so animation can drive one axis while
//! pinning another (the moon pivot yaws while its pitch is held fixed).

use glam::{Mat3, Mat4, Quat, Vec3};

/// Euler angles in radians, applied in X, then Y, then Z order
/// (`R = Rx * Ry * Rz`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Euler {
    /// Pitch.
    pub x: f32,
    /// Yaw.
    pub y: f32,
    /// Roll.
    pub z: f32,
}

impl Euler {
    pub const ZERO: Euler = Euler {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_quat(self) -> Quat {
        Quat::from_rotation_x(self.x) * Quat::from_rotation_y(self.y) * Quat::from_rotation_z(self.z)
    }

    /// Decompose a rotation back into XYZ angles. Near gimbal lock
    /// (|pitch about Y| = 90°) roll is folded into pitch and `z` is 0.
    pub fn from_quat(rotation: Quat) -> Self {
        let m = Mat3::from_quat(rotation);
        // Row/column naming: mRC is row R, column C.
        let m11 = m.x_axis.x;
        let m12 = m.y_axis.x;
        let m13 = m.z_axis.x;
        let m22 = m.y_axis.y;
        let m23 = m.z_axis.y;
        let m32 = m.y_axis.z;
        let m33 = m.z_axis.z;

        let y = m13.clamp(-1.0, 1.0).asin();
        if m13.abs() < 0.999_999_9 {
            Self::new((-m23).atan2(m33), y, (-m12).atan2(m11))
        } else {
            Self::new(m32.atan2(m22), y, 0.0)
        }
    }
}

/// A node's transform relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Euler,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Euler::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Parent-space matrix: translate * rotate * scale.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation.to_quat(), self.position)
    }

    /// Orient so the local -Z axis faces `target` (parent space), keeping
    /// `up` as close to local +Y as possible. No-op when `target` coincides
    /// with the position.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let Some(forward) = (target - self.position).try_normalize() else {
            return;
        };
        let up = if forward.cross(up).length_squared() < 1e-10 {
            Vec3::Z
        } else {
            up
        };
        let view = Mat4::look_to_rh(self.position, forward, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.rotation = Euler::from_quat(rotation);
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn assert_vec3_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn test_identity_matrix() {
        assert_eq!(Transform::IDENTITY.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_yaw_rotates_about_y() {
        let t = Transform {
            rotation: Euler::new(0.0, FRAC_PI_2, 0.0),
            ..Transform::IDENTITY
        };
        assert_vec3_near(t.matrix().transform_point3(Vec3::X), Vec3::NEG_Z);
    }

    #[test]
    fn test_rotation_order_is_x_then_y_then_z() {
        let e = Euler::new(0.3, 0.5, -0.2);
        let expected = Mat4::from_rotation_x(0.3) * Mat4::from_rotation_y(0.5) * Mat4::from_rotation_z(-0.2);
        let got = Mat4::from_quat(e.to_quat());
        assert!(got.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_euler_quat_roundtrip_away_from_gimbal_lock() {
        let e = Euler::new(0.4, -1.1, 2.0);
        let back = Euler::from_quat(e.to_quat());
        assert!((back.x - e.x).abs() < 1e-4);
        assert!((back.y - e.y).abs() < 1e-4);
        assert!((back.z - e.z).abs() < 1e-4);
    }

    #[test]
    fn test_look_at_faces_target() {
        let mut t = Transform::from_position(Vec3::new(8.0, 0.0, 4.0));
        t.look_at(Vec3::ZERO, Vec3::Y);
        let forward = t.rotation.to_quat() * Vec3::NEG_Z;
        assert_vec3_near(forward, (Vec3::ZERO - t.position).normalize());
    }

    #[test]
    fn test_look_at_self_is_noop() {
        let mut t = Transform::from_position(Vec3::ONE);
        t.look_at(Vec3::ONE, Vec3::Y);
        assert_eq!(t.rotation, Euler::ZERO);
    }
}
