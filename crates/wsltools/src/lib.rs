mod apps;
mod distro;
mod error;
mod registry;
mod themes;

pub use apps::Application;
pub use distro::Distro;
pub use error::{Error, Result};
pub use registry::Registry;

pub use wsltools_platform::{DistroRecord, WslError, posix_path_from_unc};
