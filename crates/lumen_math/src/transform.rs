// Transform utilities for Mat4
//
// Extends glam::Mat4 with the bounding-box and normal transforms the
// primitives need. glam already provides transform_point3, transform_vector3
// and inverse.

use crate::Aabb;
use glam::{Mat3, Mat4, Vec3};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transform a surface normal with the inverse transpose of the upper 3x3.
    /// The result is normalized.
    fn transform_normal(&self, normal: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        let lo = aabb.min();
        let hi = aabb.max();

        let mut result = Aabb::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 4 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 1 == 0 { lo.z } else { hi.z },
            );
            result = result.include_point(self.transform_point3(corner));
        }

        Aabb::from_points(result.min(), result.max())
    }

    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        let normal_matrix = Mat3::from_mat4(*self).inverse().transpose();
        (normal_matrix * normal).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_aabb_identity() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let transformed = Mat4::IDENTITY.transform_aabb(&aabb);

        assert!((transformed.min() - aabb.min()).length() < 0.001);
        assert!((transformed.max() - aabb.max()).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let transformed = mat.transform_aabb(&Aabb::from_points(Vec3::ZERO, Vec3::ONE));

        assert!((transformed.min() - Vec3::new(5.0, 5.0, 5.0)).length() < 0.001);
        assert!((transformed.max() - Vec3::new(6.0, 6.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_rotation_grows_box() {
        use std::f32::consts::FRAC_PI_4;

        let mat = Mat4::from_rotation_y(FRAC_PI_4);
        let transformed = mat.transform_aabb(&Aabb::from_points(Vec3::splat(-1.0), Vec3::ONE));

        let expected = 2.0_f32.sqrt();
        assert!((transformed.x.max - expected).abs() < 0.001);
        assert!((transformed.y.max - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_transform_normal_non_uniform_scale() {
        // A plane tilted 45 degrees keeps a perpendicular normal after scaling
        let mat = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let normal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let tangent = Vec3::new(1.0, -1.0, 0.0);

        let n = mat.transform_normal(normal);
        let t = mat.transform_vector3(tangent);

        assert!(n.dot(t).abs() < 1e-5);
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mat4_inverse_round_trip() {
        let mat = Mat4::from_rotation_y(0.7) * Mat4::from_translation(Vec3::new(10.0, 20.0, 30.0));
        let point = Vec3::new(1.0, 2.0, 3.0);
        let back = mat.inverse().transform_point3(mat.transform_point3(point));

        assert!((back - point).length() < 0.001);
    }
}
