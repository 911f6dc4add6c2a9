use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Spherical harmonics coefficients stored per Gaussian (degree 3)
pub const SH_COEFFS_PER_POINT: usize = 16;

/// Maximum supported spherical harmonics degree
pub const MAX_SH_DEGREE: u32 = 3;

/// A single 3D Gaussian as the preprocess shader reads it
///
/// Memory layout: 48 bytes, vec4-aligned fields
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Gaussian {
    /// World-space mean
    pub position: [f32; 3],
    /// Linear opacity [0, 1]
    pub opacity: f32,
    /// Linear standard deviation along each local axis
    pub scale: [f32; 3],
    pub _pad: f32,
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
}

impl Gaussian {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(position: [f32; 3], scale: [f32; 3], rotation: [f32; 4], opacity: f32) -> Self {
        Self {
            position,
            opacity,
            scale,
            _pad: 0.0,
            rotation: normalize_quat(rotation),
        }
    }

    /// Create a simple spherical Gaussian (uniform scale, no rotation)
    pub fn sphere(position: [f32; 3], radius: f32, opacity: f32) -> Self {
        Self::new(position, [radius; 3], [0.0, 0.0, 0.0, 1.0], opacity)
    }
}

/// View-dependent color: 16 RGB coefficients, coefficient-major
///
/// Memory layout: 192 bytes. Coefficients above the cloud's degree are zero.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ShCoefficients {
    pub coeffs: [[f32; 3]; SH_COEFFS_PER_POINT],
}

impl ShCoefficients {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Degree-0 coefficients that evaluate to `color` in [0, 1]
    pub fn from_rgb(color: [f32; 3]) -> Self {
        let mut sh = Self::zeroed();
        sh.coeffs[0] = color.map(rgb_to_sh0);
        sh
    }

    /// Color as seen from any direction, ignoring higher bands
    pub fn base_color(&self) -> [f32; 3] {
        self.coeffs[0].map(|c| (SH_C0 * c + 0.5).max(0.0))
    }
}

/// Zeroth-band SH normalization constant
pub const SH_C0: f32 = 0.282_094_8;

/// Inverse of the degree-0 color evaluation `SH_C0 * c + 0.5`
pub fn rgb_to_sh0(value: f32) -> f32 {
    (value - 0.5) / SH_C0
}

/// Number of SH coefficients used by a given degree
pub fn sh_coeffs_for_degree(degree: u32) -> usize {
    let d = degree.min(MAX_SH_DEGREE) as usize + 1;
    d * d
}

pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len > 0.0 && len.is_finite() {
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}

/// Host-side point cloud: one `Gaussian` and one `ShCoefficients` per point
#[derive(Clone, Debug, Default)]
pub struct GaussianCloud {
    gaussians: Vec<Gaussian>,
    sh: Vec<ShCoefficients>,
    sh_degree: u32,
}

impl GaussianCloud {
    /// Pair up Gaussians and SH coefficients
    ///
    /// Returns `None` when the two lists differ in length.
    pub fn new(gaussians: Vec<Gaussian>, sh: Vec<ShCoefficients>, sh_degree: u32) -> Option<Self> {
        if gaussians.len() != sh.len() {
            return None;
        }
        Some(Self {
            gaussians,
            sh,
            sh_degree: sh_degree.min(MAX_SH_DEGREE),
        })
    }

    pub fn len(&self) -> usize {
        self.gaussians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaussians.is_empty()
    }

    pub fn sh_degree(&self) -> u32 {
        self.sh_degree
    }

    pub fn gaussians(&self) -> &[Gaussian] {
        &self.gaussians
    }

    pub fn sh_coefficients(&self) -> &[ShCoefficients] {
        &self.sh
    }

    /// Axis-aligned bounds of the Gaussian means, `None` when empty
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.gaussians.iter().map(|g| Vec3::from(g.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}
