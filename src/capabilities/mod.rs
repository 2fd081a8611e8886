//! # Capabilities and Bundles
//!
//! Capabilities are the callable actions offered to an agent. They arrive
//! either one at a time through the [`CapabilityRegistry`] (native tools,
//! MCP servers) or grouped into named [`Bundle`]s through the
//! [`BundleRegistry`]. Both registries write to the shared multi-index
//! [`Store`](crate::store::Store).
//!
//! ## Bundle Flow
//!
//! 1. A manifest (`web.yaml`) declares a bundle, its tags, its dependencies
//!    and the capabilities it owns
//! 2. `BundleRegistry::load_directory` registers the bundle and stamps each
//!    capability with `source = "bundle:<name>"` and the bundle's tags
//! 3. The relevance index is updated with the bundle's description and tags
//! 4. `BundleRegistry::resolve(["web"])` expands dependencies and returns
//!    the capability set an agent needs

pub mod bundle;
pub mod bundle_registry;
pub mod capability;
pub mod error;
pub mod manifest;
pub mod registry;

pub use bundle::{Bundle, BundleExample};
pub use bundle_registry::{BundleCapability, BundleRegistry};
pub use capability::{
    bool_param, bundle_source, enum_param, int_param, object_schema, string_param,
    CapabilityDef, HandlerRef, StoredCapability, BUNDLE_SOURCE_PREFIX, SOURCE_NATIVE,
};
pub use error::RegistryError;
pub use manifest::BundleManifest;
pub use registry::CapabilityRegistry;
