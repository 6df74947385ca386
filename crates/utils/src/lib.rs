pub mod build_info;
pub mod logging;

pub use build_info::BUILD_INFO;
