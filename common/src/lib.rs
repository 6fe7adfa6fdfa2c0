//! Shared plumbing for the volseg workspace: voxel grids, logging, config files
//! and observer callbacks.

pub mod callback;
pub mod file_format;
pub mod grid3;
pub mod log_setup;

pub use callback::Callback;
pub use file_format::{load_config, FileFormatError, SerdeFormat, SerdeFormatError, SerdeFormatResult};
pub use grid3::Grid3;
