//! Binary little-endian PLY reader for trained 3DGS point clouds
//!
//! Expects the usual 3DGS vertex properties: `x y z`, `f_dc_0..2`,
//! `f_rest_*`, `opacity`, `scale_0..2`, `rot_0..3`. Stored values are in
//! activation space and converted here:
//! - `scale_*` is log-scale, exponentiated
//! - `opacity` is a logit, passed through a sigmoid
//! - `rot_0` is the quaternion's real part
//! - `f_rest_*` is channel-major (all red, then green, then blue)

use crate::error::{DataError, DataResult};
use crate::gaussian::{Gaussian, GaussianCloud, ShCoefficients};

use bytemuck::Zeroable;
use std::path::Path;

const END_HEADER: &[u8] = b"end_header";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarKind {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Read one value; `bytes` holds exactly `size()` bytes
    fn read(self, bytes: &[u8]) -> f32 {
        match self {
            Self::I8 => bytes[0] as i8 as f32,
            Self::U8 => bytes[0] as f32,
            Self::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            Self::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f32,
            Self::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            Self::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            Self::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Self::F64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                f64::from_le_bytes(b) as f32
            }
        }
    }
}

#[derive(Clone, Debug)]
struct Property {
    name: String,
    kind: ScalarKind,
    offset: usize,
}

/// Parsed header of the vertex element
#[derive(Clone, Debug)]
pub struct PlyHeader {
    pub vertex_count: usize,
    properties: Vec<Property>,
    stride: usize,
    /// Byte offset of the first vertex in the file
    data_offset: usize,
}

impl PlyHeader {
    /// Names of the vertex properties in file order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Bytes per vertex record
    pub fn stride(&self) -> usize {
        self.stride
    }

    fn find(&self, name: &'static str) -> DataResult<&Property> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .ok_or(DataError::MissingProperty(name))
    }

    fn rest_count(&self) -> usize {
        self.properties.iter().filter(|p| p.name.starts_with("f_rest_")).count()
    }
}

/// Parse the ASCII header up to and including `end_header`
pub fn parse_header(bytes: &[u8]) -> DataResult<PlyHeader> {
    let end = bytes
        .windows(END_HEADER.len())
        .position(|w| w == END_HEADER)
        .ok_or_else(|| DataError::InvalidHeader("missing end_header".into()))?;
    let newline = bytes[end..]
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| DataError::InvalidHeader("end_header not terminated".into()))?;
    let data_offset = end + newline + 1;

    let text = std::str::from_utf8(&bytes[..end])
        .map_err(|_| DataError::InvalidHeader("header is not ASCII".into()))?;
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    if lines.next() != Some("ply") {
        return Err(DataError::InvalidHeader("missing ply magic".into()));
    }

    let mut format_seen = false;
    let mut vertex_count = None;
    let mut in_vertex = false;
    let mut properties = Vec::new();
    let mut stride = 0;

    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["format", "binary_little_endian", _] => format_seen = true,
            ["format", other, ..] => return Err(DataError::UnsupportedFormat(other.to_string())),
            ["comment", ..] | ["obj_info", ..] => {}
            ["element", name, count] => {
                if vertex_count.is_some() {
                    // Elements after the vertices (faces etc.) are never read
                    in_vertex = false;
                    continue;
                }
                if *name != "vertex" {
                    return Err(DataError::UnsupportedFormat(format!("element '{name}' before vertex")));
                }
                let count = count
                    .parse()
                    .map_err(|_| DataError::InvalidHeader(format!("bad vertex count '{count}'")))?;
                vertex_count = Some(count);
                in_vertex = true;
            }
            ["property", "list", ..] if in_vertex => {
                return Err(DataError::UnsupportedFormat("list property on vertex".into()));
            }
            ["property", kind, name] if in_vertex => {
                let kind = ScalarKind::parse(kind)
                    .ok_or_else(|| DataError::UnsupportedFormat(format!("property type '{kind}'")))?;
                properties.push(Property {
                    name: name.to_string(),
                    kind,
                    offset: stride,
                });
                stride += kind.size();
            }
            ["property", ..] => {}
            _ => return Err(DataError::InvalidHeader(format!("unexpected line '{line}'"))),
        }
    }

    if !format_seen {
        return Err(DataError::InvalidHeader("missing format line".into()));
    }
    let vertex_count = vertex_count.ok_or_else(|| DataError::InvalidHeader("no vertex element".into()))?;

    Ok(PlyHeader {
        vertex_count,
        properties,
        stride,
        data_offset,
    })
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Spherical harmonics degree implied by the number of `f_rest_*` properties
pub fn degree_from_rest_count(count: usize) -> DataResult<u32> {
    match count {
        0 => Ok(0),
        9 => Ok(1),
        24 => Ok(2),
        45 => Ok(3),
        n => Err(DataError::UnsupportedShRest(n)),
    }
}

/// Decode a complete PLY file held in memory
pub fn parse_ply(bytes: &[u8]) -> DataResult<GaussianCloud> {
    let header = parse_header(bytes)?;

    let position = [header.find("x")?, header.find("y")?, header.find("z")?];
    let scale = [header.find("scale_0")?, header.find("scale_1")?, header.find("scale_2")?];
    let rotation = [
        header.find("rot_0")?,
        header.find("rot_1")?,
        header.find("rot_2")?,
        header.find("rot_3")?,
    ];
    let opacity = header.find("opacity")?;
    let dc = [header.find("f_dc_0")?, header.find("f_dc_1")?, header.find("f_dc_2")?];

    let rest_count = header.rest_count();
    let sh_degree = degree_from_rest_count(rest_count)?;
    let rest_per_channel = rest_count / 3;
    let rest: Vec<&Property> = (0..rest_count)
        .map(|i| {
            header
                .properties
                .iter()
                .find(|p| p.name == format!("f_rest_{i}"))
                .ok_or(DataError::MissingProperty("f_rest_*"))
        })
        .collect::<DataResult<_>>()?;

    let body = &bytes[header.data_offset..];
    let expected = header
        .vertex_count
        .checked_mul(header.stride)
        .ok_or_else(|| DataError::InvalidHeader("vertex count overflows".into()))?;
    if body.len() < expected {
        return Err(DataError::Truncated {
            expected,
            found: body.len(),
        });
    }

    let mut gaussians = Vec::with_capacity(header.vertex_count);
    let mut sh = Vec::with_capacity(header.vertex_count);

    for record in body[..expected].chunks_exact(header.stride) {
        let get = |p: &Property| p.kind.read(&record[p.offset..p.offset + p.kind.size()]);

        let [w, x, y, z] = rotation.map(get);
        gaussians.push(Gaussian::new(
            position.map(get),
            scale.map(|p| get(p).exp()),
            [x, y, z, w],
            sigmoid(get(opacity)),
        ));

        let mut coeffs = ShCoefficients::zeroed();
        coeffs.coeffs[0] = dc.map(get);
        for k in 0..rest_per_channel {
            for c in 0..3 {
                coeffs.coeffs[k + 1][c] = get(rest[c * rest_per_channel + k]);
            }
        }
        sh.push(coeffs);
    }

    tracing::debug!(
        points = gaussians.len(),
        sh_degree,
        stride = header.stride,
        "Parsed PLY point cloud"
    );

    // Lengths match by construction
    Ok(GaussianCloud::new(gaussians, sh, sh_degree).unwrap_or_default())
}

/// Read and decode a PLY file from disk
pub fn load_ply(path: impl AsRef<Path>) -> DataResult<GaussianCloud> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let cloud = parse_ply(&bytes)?;
    tracing::info!("Loaded {} Gaussians (SH degree {}) from {}", cloud.len(), cloud.sh_degree(), path.display());
    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BASE_PROPS: [&str; 14] = [
        "x", "y", "z", "f_dc_0", "f_dc_1", "f_dc_2", "opacity", "scale_0", "scale_1", "scale_2", "rot_0", "rot_1",
        "rot_2", "rot_3",
    ];

    /// Build a float32 PLY with the base properties followed by `rest` f_rest fields
    fn build_ply(rows: &[Vec<f32>], rest: usize) -> Vec<u8> {
        let mut header = format!("ply\nformat binary_little_endian 1.0\ncomment test\nelement vertex {}\n", rows.len());
        for name in BASE_PROPS {
            header.push_str(&format!("property float {name}\n"));
        }
        for i in 0..rest {
            header.push_str(&format!("property float f_rest_{i}\n"));
        }
        header.push_str("end_header\n");

        let mut bytes = header.into_bytes();
        for row in rows {
            assert_eq!(row.len(), BASE_PROPS.len() + rest);
            for v in row {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        bytes
    }

    fn base_row() -> Vec<f32> {
        // x y z, dc, opacity logit 0, log scales, rot (w x y z)
        vec![1.0, 2.0, 3.0, 0.1, 0.2, 0.3, 0.0, 0.0, 1.0_f32.ln(), 2.0_f32.ln(), 2.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn test_parse_degree_zero() {
        let cloud = parse_ply(&build_ply(&[base_row()], 0)).unwrap();
        assert_eq!(cloud.len(), 1);
        assert_eq!(cloud.sh_degree(), 0);

        let g = cloud.gaussians()[0];
        assert_eq!(g.position, [1.0, 2.0, 3.0]);
        assert_relative_eq!(g.opacity, 0.5);
        assert_relative_eq!(g.scale[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(g.scale[2], 2.0, epsilon = 1e-6);
        // rot_0 is w, normalized
        assert_eq!(g.rotation, [0.0, 0.0, 0.0, 1.0]);

        let sh = cloud.sh_coefficients()[0];
        assert_eq!(sh.coeffs[0], [0.1, 0.2, 0.3]);
        assert!(sh.coeffs[1..].iter().all(|c| *c == [0.0; 3]));
    }

    #[test]
    fn test_rest_is_reordered_coefficient_major() {
        let mut row = base_row();
        // 3 coefficients per channel: red 10..12, green 20..22, blue 30..32
        row.extend([10.0, 11.0, 12.0, 20.0, 21.0, 22.0, 30.0, 31.0, 32.0]);
        let cloud = parse_ply(&build_ply(&[row], 9)).unwrap();
        assert_eq!(cloud.sh_degree(), 1);

        let sh = cloud.sh_coefficients()[0];
        assert_eq!(sh.coeffs[1], [10.0, 20.0, 30.0]);
        assert_eq!(sh.coeffs[2], [11.0, 21.0, 31.0]);
        assert_eq!(sh.coeffs[3], [12.0, 22.0, 32.0]);
    }

    #[test]
    fn test_degree_from_rest_count() {
        assert_eq!(degree_from_rest_count(45).unwrap(), 3);
        assert!(matches!(degree_from_rest_count(10), Err(DataError::UnsupportedShRest(10))));
    }

    #[test]
    fn test_rejects_ascii_format() {
        let bytes = b"ply\nformat ascii 1.0\nelement vertex 0\nend_header\n";
        assert!(matches!(parse_ply(bytes), Err(DataError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_rejects_missing_magic() {
        let bytes = b"plx\nformat binary_little_endian 1.0\nend_header\n";
        assert!(matches!(parse_ply(bytes), Err(DataError::InvalidHeader(_))));
    }

    #[test]
    fn test_rejects_missing_property() {
        let bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 0\nproperty float x\nend_header\n";
        assert!(matches!(parse_ply(bytes), Err(DataError::MissingProperty("y"))));
    }

    #[test]
    fn test_rejects_truncated_body() {
        let mut bytes = build_ply(&[base_row(), base_row()], 0);
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(parse_ply(&bytes), Err(DataError::Truncated { .. })));
    }

    #[test]
    fn test_rejects_overflowing_vertex_count() {
        let mut header = format!("ply\nformat binary_little_endian 1.0\nelement vertex {}\n", u64::MAX);
        for name in BASE_PROPS {
            header.push_str(&format!("property float {name}\n"));
        }
        header.push_str("end_header\n");
        assert!(matches!(parse_ply(header.as_bytes()), Err(DataError::InvalidHeader(_))));
    }

    #[test]
    fn test_header_stride_and_names() {
        let bytes = build_ply(&[], 0);
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.vertex_count, 0);
        assert_eq!(header.stride(), 14 * 4);
        assert_eq!(header.property_names().next(), Some("x"));
        assert!(parse_ply(&bytes).unwrap().is_empty());
    }
}
