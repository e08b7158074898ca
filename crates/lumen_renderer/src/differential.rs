//! Ray differential transport through a surface interaction.
//!
//! Differentials follow Igehy, "Tracing Ray Differentials" (SIGGRAPH 1999).
//! `D` is the incoming unit direction and `N` the shading normal facing it.

use lumen_math::{Differential, Ray, Vec3};

/// Position differentials at the hit point `ray.at(t)`.
///
/// The offset rays are advanced by `t` and then projected back onto the
/// tangent plane along `D`. `normal` is the geometric normal; for triangles
/// that is the face normal rather than the interpolated one.
pub fn transfer(ray: &Ray, t: f32, normal: Vec3) -> Differential {
    let d = ray.direction;
    let dn = d.dot(normal);
    let differentials = &ray.differentials;
    let moved = Differential::new(
        differentials.d_position.dx + t * differentials.d_direction.dx,
        differentials.d_position.dy + t * differentials.d_direction.dy,
    );
    if dn.abs() < 1e-8 {
        return moved;
    }
    moved.map(|v| v - (v.dot(normal) / dn) * d)
}

/// Mirror `d` about `n`.
#[inline]
pub fn reflect_direction(d: Vec3, n: Vec3) -> Vec3 {
    d - 2.0 * d.dot(n) * n
}

/// Direction differentials of the mirror direction.
pub fn reflect(d: Vec3, n: Vec3, dd: &Differential, dn: &Differential) -> Differential {
    let d_dot_n = d.dot(n);
    let along = |ddir: Vec3, dnorm: Vec3| {
        let d_d_dot_n = ddir.dot(n) + d.dot(dnorm);
        ddir - 2.0 * (d_dot_n * dnorm + d_d_dot_n * n)
    };
    Differential::new(along(dd.dx, dn.dx), along(dd.dy, dn.dy))
}

/// Refract `d` through a surface with relative index `eta` (incident over
/// transmitted). Returns `None` on total internal reflection.
pub fn refract_direction(d: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = -d.dot(n);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    let mu = eta * cos_i - k.sqrt();
    Some((eta * d + mu * n).normalize())
}

/// Direction differentials of the refracted direction `t_dir`.
///
/// `T = eta D + mu N` with `mu = T.N - eta (D.N)`. The relative index is
/// constant across the footprint so only `mu` varies.
pub fn refract(
    d: Vec3,
    n: Vec3,
    t_dir: Vec3,
    eta: f32,
    dd: &Differential,
    dn: &Differential,
) -> Differential {
    let d_dot_n = d.dot(n);
    let t_dot_n = t_dir.dot(n);
    let mu = t_dot_n - eta * d_dot_n;
    let dmu_factor = if t_dot_n.abs() > 1e-8 {
        -eta + eta * eta * d_dot_n / t_dot_n
    } else {
        -eta
    };
    let along = |ddir: Vec3, dnorm: Vec3| {
        let d_d_dot_n = ddir.dot(n) + d.dot(dnorm);
        let dmu = dmu_factor * d_d_dot_n;
        eta * ddir + mu * dnorm + dmu * n
    };
    Differential::new(along(dd.dx, dn.dx), along(dd.dy, dn.dy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::RayDifferentials;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_transfer_parallel_rays() {
        // Offset origins, parallel directions: the footprint keeps its size
        let ray = Ray::new(Vec3::ZERO, Vec3::Z).with_differentials(RayDifferentials {
            d_position: Differential::new(Vec3::X * 0.01, Vec3::Y * 0.01),
            d_direction: Differential::ZERO,
        });
        let dp = transfer(&ray, 4.0, -Vec3::Z);
        assert!(approx(dp.dx, Vec3::X * 0.01));
        assert!(approx(dp.dy, Vec3::Y * 0.01));
    }

    #[test]
    fn test_transfer_diverging_rays() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z).with_differentials(RayDifferentials {
            d_position: Differential::ZERO,
            d_direction: Differential::new(Vec3::X * 0.01, Vec3::Y * 0.01),
        });
        let dp = transfer(&ray, 4.0, -Vec3::Z);
        assert!(approx(dp.dx, Vec3::X * 0.04));
        assert!(approx(dp.dy, Vec3::Y * 0.04));
    }

    #[test]
    fn test_transfer_projects_onto_tilted_plane() {
        // Plane tilted 45 degrees around X: the y footprint stretches by sqrt(2)
        let n = Vec3::new(0.0, 1.0, -1.0).normalize();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z).with_differentials(RayDifferentials {
            d_position: Differential::new(Vec3::X, Vec3::Y),
            d_direction: Differential::ZERO,
        });
        let dp = transfer(&ray, 1.0, n);
        assert!(dp.dx.dot(n).abs() < 1e-5);
        assert!(dp.dy.dot(n).abs() < 1e-5);
        assert!((dp.dy.length() - 2f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_reflect_direction() {
        let d = Vec3::new(1.0, -1.0, 0.0).normalize();
        let r = reflect_direction(d, Vec3::Y);
        assert!(approx(r, Vec3::new(1.0, 1.0, 0.0).normalize()));
    }

    #[test]
    fn test_reflect_flat_mirror_flips_component() {
        // With a constant normal, reflection mirrors the direction differential
        let dd = Differential::new(Vec3::new(0.0, 0.0, 0.1), Vec3::new(0.0, 0.1, 0.0));
        let dr = reflect(-Vec3::Z, Vec3::Z, &dd, &Differential::ZERO);
        assert!(approx(dr.dx, Vec3::new(0.0, 0.0, -0.1)));
        assert!(approx(dr.dy, Vec3::new(0.0, 0.1, 0.0)));
    }

    #[test]
    fn test_refract_direction_normal_incidence() {
        let t = refract_direction(-Vec3::Z, Vec3::Z, 1.0 / 1.5).unwrap();
        assert!(approx(t, -Vec3::Z));
    }

    #[test]
    fn test_refract_snell() {
        let eta = 1.0 / 1.5;
        let d = Vec3::new(0.6, -0.8, 0.0);
        let t = refract_direction(d, Vec3::Y, eta).unwrap();
        let sin_i = d.x.abs();
        let sin_t = t.x.abs();
        assert!((sin_i * eta - sin_t).abs() < 1e-5);
        assert!(t.y < 0.0);
    }

    #[test]
    fn test_total_internal_reflection() {
        // Grazing exit from glass into air
        let d = Vec3::new(0.9, -0.1, 0.0).normalize();
        assert!(refract_direction(d, Vec3::Y, 1.5).is_none());
    }

    #[test]
    fn test_refract_unit_eta_passes_differentials() {
        // Index-matched interface: the ray is unbent, so are its differentials
        let dd = Differential::new(Vec3::X * 0.1, Vec3::Y * 0.1);
        let d = -Vec3::Z;
        let n = Vec3::Z;
        let t = refract_direction(d, n, 1.0).unwrap();
        let dt = refract(d, n, t, 1.0, &dd, &Differential::ZERO);
        assert!(approx(dt.dx, dd.dx));
        assert!(approx(dt.dy, dd.dy));
    }
}
