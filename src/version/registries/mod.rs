//! Registry protocol implementations

pub mod auth;
pub mod docker;
pub mod ecr;
pub mod link;

pub use docker::DockerRegistry;
