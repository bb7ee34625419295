//! # oscfg Core
//!
//! Domain types, traits, and error definitions for oscfg, the engine that
//! turns an operating-system configuration descriptor into a CoreOS
//! cloud-config document.
//!
//! ## Design Philosophy
//!
//! The descriptor model and the content-resolution seam are defined here.
//! Resolver backends live in `oscfg-resolvers`; document synthesis lives in
//! `oscfg-cloudconfig`. This keeps the dependency graph pointing inward:
//! - Resolvers can be swapped without touching the engine
//! - Tests can drive the engine with in-memory content
//! - The descriptor can be loaded by any front end (CLI, controller)

pub mod error;
pub mod descriptor;
pub mod resolver;

// Re-export key types at crate root for ergonomics
pub use error::{DescriptorError, ResolveError};
pub use descriptor::{
    ContentRef, CriConfig, CriName, DropIn, FileContent, FileSpec, InlineContent,
    OsConfigDescriptor, Purpose, SecretRef, UnitCommand, UnitSpec, DEFAULT_FILE_PERMISSIONS,
    MAX_FILE_PERMISSIONS,
};
pub use resolver::{ContentResolver, ResolveContext};
