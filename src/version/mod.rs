//! Version management layer for image lifecycle checking
//!
//! This module provides the core functionality for listing image tags from
//! Docker Registry v2 endpoints and comparing them with deployed versions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  TagLister  │────▶│   SemVer    │────▶│   Checker   │
//! │   (fetch)   │     │  (select)   │     │ (classify)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Registries  │
//! │(docker, ecr)│
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`checker`]: Lifecycle status and classification
//! - [`error`]: Error types for registry operations
//! - [`registry`]: Trait for listing tags from remote registries
//! - [`registries`]: Docker Registry v2 client, auth challenges, pagination, ECR
//! - [`semver`]: Tolerant version parsing and latest-tag selection

pub mod checker;
pub mod error;
pub mod registries;
pub mod registry;
pub mod semver;
