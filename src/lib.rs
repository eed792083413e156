pub mod catalog;
pub mod config;
pub mod error;
pub mod image;
pub mod lifecycle;
pub mod logging;
pub mod report;
pub mod version;
