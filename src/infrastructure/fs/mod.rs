//! File System Implementations
//!
//! Concrete implementation of the FileSystem port plus path helpers.

mod home;
mod local;

pub use home::{expand_home, shipwright_home_dir, SHIPWRIGHT_TEST_HOME_VAR};
pub use local::LocalFs;
