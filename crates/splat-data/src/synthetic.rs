//! Procedural point clouds for demos and tests

use crate::gaussian::{Gaussian, GaussianCloud, ShCoefficients};

/// Generate a deterministic cloud of `count` Gaussians on a noisy sphere shell
///
/// Same `(count, seed)` always yields the same cloud. Colors follow the
/// direction from the origin so the shape reads clearly in the viewer.
pub fn generate_synthetic_cloud(count: usize, seed: u64) -> GaussianCloud {
    let mut rng = seed;
    let mut rand = || {
        rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (rng >> 40) as f32 / (1u64 << 24) as f32
    };

    let mut gaussians = Vec::with_capacity(count);
    let mut sh = Vec::with_capacity(count);

    for _ in 0..count {
        // Uniform direction on the unit sphere
        let z = rand() * 2.0 - 1.0;
        let phi = rand() * std::f32::consts::TAU;
        let r_xy = (1.0 - z * z).max(0.0).sqrt();
        let dir = [r_xy * phi.cos(), r_xy * phi.sin(), z];

        let radius = 1.0 + (rand() - 0.5) * 0.2;
        let position = dir.map(|d| d * radius);

        let scale = [0.01 + rand() * 0.03, 0.01 + rand() * 0.03, 0.005 + rand() * 0.01];
        let rotation = [rand() - 0.5, rand() - 0.5, rand() - 0.5, rand() - 0.5];
        let opacity = 0.5 + rand() * 0.5;

        gaussians.push(Gaussian::new(position, scale, rotation, opacity));
        sh.push(ShCoefficients::from_rgb(dir.map(|d| d * 0.5 + 0.5)));
    }

    tracing::debug!(count, seed, "Generated synthetic cloud");

    GaussianCloud::new(gaussians, sh, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_per_seed() {
        let a = generate_synthetic_cloud(100, 42);
        let b = generate_synthetic_cloud(100, 42);
        assert_eq!(a.gaussians(), b.gaussians());
        assert_eq!(a.sh_coefficients(), b.sh_coefficients());

        let c = generate_synthetic_cloud(100, 43);
        assert_ne!(a.gaussians(), c.gaussians());
    }

    #[test]
    fn test_points_on_shell() {
        let cloud = generate_synthetic_cloud(500, 7);
        assert_eq!(cloud.len(), 500);
        assert_eq!(cloud.sh_degree(), 0);
        for g in cloud.gaussians() {
            let r = g.position.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((0.89..=1.11).contains(&r), "radius {r}");
            assert!(g.opacity >= 0.5 && g.opacity <= 1.0);
            assert!(g.scale.iter().all(|s| *s > 0.0));
        }
    }

    #[test]
    fn test_empty() {
        assert!(generate_synthetic_cloud(0, 1).is_empty());
    }
}
