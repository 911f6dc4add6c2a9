//! Per-frame GPU orchestration for Gaussian splat rendering
//!
//! [`get_renderer`] builds a [`GaussianRenderer`] for one [`PointCloud`];
//! [`GaussianRenderer::frame`] then records preprocess, sort, count
//! propagation and the indirect draw into the caller's encoder. Nothing is
//! read back to the host: the number of drawn splats travels from the sort
//! straight into the draw arguments on the GPU timeline.

pub mod camera;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod point_cloud;
pub mod preprocess;
pub mod renderer;
pub mod resources;
pub mod shaders;
pub mod window;


pub use camera::OrbitCamera;
pub use error::{RenderError, RenderResult};
pub use frame::{record_frame, FrameBuffer, FrameEncoder, FrameStep, FRAME_SEQUENCE};
pub use point_cloud::PointCloud;
pub use renderer::{get_renderer, get_renderer_with_sorter, GaussianRenderer};
pub use window::{run, ViewerOptions};
