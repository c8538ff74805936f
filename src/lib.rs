//! Bookshelf application library
//!
//! Wires the catalog module into the kernel, database, and HTTP crates.

pub mod app;
pub mod modules;

pub use app::Application;
pub use modules::*;
