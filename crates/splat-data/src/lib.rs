pub mod error;
pub mod gaussian;
pub mod ply;
pub mod synthetic;

pub use error::{DataError, DataResult};
pub use gaussian::{Gaussian, GaussianCloud, ShCoefficients, MAX_SH_DEGREE, SH_COEFFS_PER_POINT};
pub use ply::{load_ply, parse_ply};
pub use synthetic::generate_synthetic_cloud;
