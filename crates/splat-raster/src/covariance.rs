//! 3D Gaussian to 2D screen-space projection mathematics
//!
//! CPU mirror of the preprocess compute shader. The shader is the source of
//! truth at runtime; this module pins down the same math and the validity
//! policy so they can be unit tested without a device.
//!
//! Screen space here is pixels with y pointing down, matching the fragment
//! coordinates the render shader compares against.

use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// Gaussians closer than this view-space depth are skipped
pub const NEAR_CULL_DEPTH: f32 = 0.2;

/// Centers outside `[-GUARD_BAND, GUARD_BAND]` in NDC are skipped
pub const GUARD_BAND: f32 = 1.2;

/// Variance (px²) added to the projected covariance to prevent aliasing
pub const LOW_PASS_FILTER: f32 = 0.3;

/// Build a 3D covariance matrix from scale and rotation
///
/// The covariance matrix is computed as: Σ = R * S * S^T * R^T
/// where R is the rotation matrix and S is the diagonal scale matrix.
pub fn build_covariance_3d(scale: Vec3, rotation: Quat) -> Mat3 {
    let r = Mat3::from_quat(rotation);

    // S is diagonal, so R*S is just scaling the columns of R
    let rs = Mat3::from_cols(
        r.col(0) * scale.x,
        r.col(1) * scale.y,
        r.col(2) * scale.z,
    );

    rs * rs.transpose()
}

/// Project a view-space 3D covariance matrix to 2D pixel space
///
/// Uses the Jacobian of the perspective projection, with the second row
/// negated because pixel rows grow downwards while view-space y grows up.
/// `view_pos.z` must be negative (in front of the camera).
pub fn project_covariance(cov_3d: Mat3, view_pos: Vec3, focal: Vec2) -> [[f32; 2]; 2] {
    let z = -view_pos.z;
    let z2 = z * z;

    // J = | fx/z    0     fx*x/z^2 |
    //     |  0   -fy/z   -fy*y/z^2 |
    let j = Mat3::from_cols(
        Vec3::new(focal.x / z, 0.0, 0.0),
        Vec3::new(0.0, -focal.y / z, 0.0),
        Vec3::new(focal.x * view_pos.x / z2, -focal.y * view_pos.y / z2, 0.0),
    );

    let cov = j * cov_3d * j.transpose();
    [
        [cov.col(0).x, cov.col(1).x],
        [cov.col(0).y, cov.col(1).y],
    ]
}

/// Add a low-pass filter to the covariance to prevent aliasing
pub fn apply_low_pass_filter(cov: [[f32; 2]; 2], filter_size: f32) -> [[f32; 2]; 2] {
    [
        [cov[0][0] + filter_size, cov[0][1]],
        [cov[1][0], cov[1][1] + filter_size],
    ]
}

/// Convert a 2D covariance matrix to conic form
///
/// The conic `(a, b, c)` evaluates the Gaussian as
/// `exp(-0.5 * (a*dx^2 + c*dy^2) - b*dx*dy)`.
/// Returns `None` for a degenerate covariance.
pub fn covariance_to_conic(cov: [[f32; 2]; 2]) -> Option<Vec3> {
    let det = cov[0][0] * cov[1][1] - cov[0][1] * cov[1][0];

    if det <= 0.0 {
        return None;
    }

    let det_inv = 1.0 / det;

    // Symmetric [a, b; b, c] inverts to [c, -b; -b, a] / det
    Some(Vec3::new(
        cov[1][1] * det_inv,
        -cov[0][1] * det_inv,
        cov[0][0] * det_inv,
    ))
}

/// Eigenvalues of a 2x2 symmetric matrix as `(λ_max, λ_min)`
pub fn eigenvalues_2x2(cov: [[f32; 2]; 2]) -> (f32, f32) {
    let a = cov[0][0];
    let b = cov[0][1];
    let c = cov[1][1];

    let trace = a + c;
    let det = a * c - b * b;

    let discriminant = (trace * trace * 0.25 - det).max(0.0);
    let sqrt_disc = discriminant.sqrt();

    let half_trace = trace * 0.5;
    (half_trace + sqrt_disc, half_trace - sqrt_disc)
}

/// Bounding radius in pixels (3 standard deviations along the major axis)
pub fn compute_bounding_radius(cov: [[f32; 2]; 2]) -> f32 {
    let (lambda_max, _) = eigenvalues_2x2(cov);
    3.0 * lambda_max.max(0.0).sqrt()
}

/// Sort key for a positive view depth
///
/// Positive floats order like their bit patterns, so inverting the bits makes
/// an ascending key sort produce far-to-near (back-to-front) order.
pub fn depth_sort_key(depth: f32) -> u32 {
    u32::MAX - depth.to_bits()
}

/// Camera parameters the projection needs
#[derive(Clone, Copy, Debug)]
pub struct ProjectionParams {
    pub view: Mat4,
    pub proj: Mat4,
    /// Focal lengths in pixels
    pub focal: Vec2,
    /// Surface size in pixels
    pub viewport: Vec2,
}

/// Result of projecting one Gaussian
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedSplat {
    /// Center in NDC
    pub center: Vec2,
    /// Quad half-size in NDC
    pub extent: Vec2,
    /// Inverse covariance in pixel space
    pub conic: Vec3,
    /// Bounding radius in pixels
    pub radius: f32,
    /// Positive view-space depth
    pub depth: f32,
}

impl ProjectedSplat {
    pub fn sort_key(&self) -> u32 {
        depth_sort_key(self.depth)
    }
}

/// Full projection: 3D Gaussian parameters to 2D rendering parameters
///
/// Returns `None` when the Gaussian fails the validity policy: too close to
/// (or behind) the camera, center outside the NDC guard band, or a
/// degenerate projected covariance.
pub fn project_gaussian(
    position: Vec3,
    scale: Vec3,
    rotation: Quat,
    gaussian_multiplier: f32,
    camera: &ProjectionParams,
) -> Option<ProjectedSplat> {
    let view_pos = camera.view.transform_point3(position);
    let depth = -view_pos.z;
    if depth <= NEAR_CULL_DEPTH {
        return None;
    }

    let clip = camera.proj * Vec4::new(view_pos.x, view_pos.y, view_pos.z, 1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let center = clip.truncate().truncate() / clip.w;
    if center.x.abs() > GUARD_BAND || center.y.abs() > GUARD_BAND {
        return None;
    }

    let cov_3d = build_covariance_3d(scale * gaussian_multiplier, rotation.normalize());

    // Σ_view = W * Σ * W^T with W the rotation part of the view matrix
    let view_rot = Mat3::from_mat4(camera.view);
    let cov_3d_view = view_rot * cov_3d * view_rot.transpose();

    let cov_2d = apply_low_pass_filter(
        project_covariance(cov_3d_view, view_pos, camera.focal),
        LOW_PASS_FILTER,
    );
    let conic = covariance_to_conic(cov_2d)?;
    let radius = compute_bounding_radius(cov_2d).ceil();

    Some(ProjectedSplat {
        center,
        extent: Vec2::splat(radius) * 2.0 / camera.viewport,
        conic,
        radius,
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_camera() -> ProjectionParams {
        let viewport = Vec2::new(800.0, 600.0);
        let fov_y = 60.0_f32.to_radians();
        let focal = viewport.y / (2.0 * (fov_y * 0.5).tan());
        ProjectionParams {
            view: Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y),
            proj: Mat4::perspective_rh(fov_y, viewport.x / viewport.y, 0.01, 100.0),
            focal: Vec2::splat(focal),
            viewport,
        }
    }

    #[test]
    fn test_identity_covariance() {
        let cov = build_covariance_3d(Vec3::ONE, Quat::IDENTITY);

        assert_relative_eq!(cov.col(0).x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov.col(1).y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov.col(2).z, 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov.col(0).y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_scaled_covariance() {
        let cov = build_covariance_3d(Vec3::new(2.0, 1.0, 0.5), Quat::IDENTITY);

        // Diagonal should be scale^2
        assert_relative_eq!(cov.col(0).x, 4.0, epsilon = 1e-6);
        assert_relative_eq!(cov.col(1).y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(cov.col(2).z, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_projected_covariance_on_axis() {
        // Unit Gaussian 10 units ahead, 100px focal: sigma = 10px
        let cov = project_covariance(Mat3::IDENTITY, Vec3::new(0.0, 0.0, -10.0), Vec2::splat(100.0));
        assert_relative_eq!(cov[0][0], 100.0, epsilon = 1e-3);
        assert_relative_eq!(cov[1][1], 100.0, epsilon = 1e-3);
        assert_relative_eq!(cov[0][1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_projection_flips_y_correlation() {
        // Covariance elongated along x=y in view space becomes x=-y on screen
        let cov_3d = Mat3::from_cols(
            Vec3::new(1.0, 0.8, 0.0),
            Vec3::new(0.8, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let cov = project_covariance(cov_3d, Vec3::new(0.0, 0.0, -5.0), Vec2::splat(100.0));
        assert!(cov[0][1] < 0.0);
        assert_relative_eq!(cov[0][1], cov[1][0], epsilon = 1e-6);
    }

    #[test]
    fn test_conic_inversion() {
        let conic = covariance_to_conic([[4.0, 0.0], [0.0, 1.0]]).unwrap();

        assert_relative_eq!(conic.x, 0.25, epsilon = 1e-6);
        assert_relative_eq!(conic.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(conic.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_conic() {
        assert!(covariance_to_conic([[1.0, 1.0], [1.0, 1.0]]).is_none());
        assert!(covariance_to_conic([[0.0, 0.0], [0.0, 0.0]]).is_none());
    }

    #[test]
    fn test_eigenvalues() {
        let (l1, l2) = eigenvalues_2x2([[1.0, 0.0], [0.0, 1.0]]);
        assert_relative_eq!(l1, 1.0, epsilon = 1e-6);
        assert_relative_eq!(l2, 1.0, epsilon = 1e-6);

        let (l1, l2) = eigenvalues_2x2([[4.0, 0.0], [0.0, 1.0]]);
        assert_relative_eq!(l1, 4.0, epsilon = 1e-6);
        assert_relative_eq!(l2, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bounding_radius() {
        assert_relative_eq!(compute_bounding_radius([[1.0, 0.0], [0.0, 1.0]]), 3.0, epsilon = 1e-6);
        assert_relative_eq!(compute_bounding_radius([[4.0, 0.0], [0.0, 1.0]]), 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_sort_key_is_back_to_front() {
        let near = depth_sort_key(1.0);
        let far = depth_sort_key(50.0);
        let farther = depth_sort_key(1000.0);
        assert!(farther < far);
        assert!(far < near);
    }

    #[test]
    fn test_visible_gaussian_projects_to_center() {
        let camera = test_camera();
        let splat = project_gaussian(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::splat(0.1),
            Quat::IDENTITY,
            1.0,
            &camera,
        )
        .expect("gaussian in front of the camera is valid");

        assert_relative_eq!(splat.center.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(splat.center.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(splat.depth, 5.0, epsilon = 1e-5);
        assert!(splat.radius > 0.0);
        assert_relative_eq!(splat.extent.x, splat.radius * 2.0 / 800.0, epsilon = 1e-6);
    }

    #[test]
    fn test_multiplier_grows_footprint() {
        let camera = test_camera();
        let project = |m: f32| {
            project_gaussian(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(0.1), Quat::IDENTITY, m, &camera)
                .unwrap()
                .radius
        };
        assert!(project(2.0) > project(1.0));
        assert!(project(0.5) < project(1.0));
    }

    #[test]
    fn test_validity_policy() {
        let camera = test_camera();
        let project = |p: Vec3| project_gaussian(p, Vec3::splat(0.1), Quat::IDENTITY, 1.0, &camera);

        // Behind the camera
        assert!(project(Vec3::new(0.0, 0.0, 5.0)).is_none());
        // Inside the near cull distance
        assert!(project(Vec3::new(0.0, 0.0, -0.1)).is_none());
        // Far outside the guard band
        assert!(project(Vec3::new(50.0, 0.0, -5.0)).is_none());
        // Just ahead and on screen
        assert!(project(Vec3::new(0.5, 0.5, -5.0)).is_some());
    }
}
