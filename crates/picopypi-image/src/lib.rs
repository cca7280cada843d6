//! # picopypi-image
//!
//! The ARMv7l build image as a typed value.
//!
//! Handles:
//! - **Definition**: pinned base, build user, shared repos directory, fixed
//!   environment, exec-form entrypoint and the single volume.
//! - **Directives**: the strictly linear build sequence.
//! - **Containerfile**: text rendering with provenance labels.
//! - **Context**: reproducible gzip tar build context.
//! - **Compose**: `docker-compose.yml` rendering for the build service.
//! - **Registry**: local catalog of built images.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod compose;
pub mod containerfile;
pub mod context;
pub mod definition;
pub mod directive;
pub mod hash;
pub mod registry;

pub use containerfile::Containerfile;
pub use context::BuildContext;
pub use definition::{BuildUser, Entrypoint, ImageDefinition, ImageDefinitionBuilder};
pub use directive::Directive;
