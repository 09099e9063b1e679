//! Version normalization for package-feed publishing.
//!
//! The feed requires strict semantic versions while release tags follow a
//! free-form convention (`beta_0.1.0.1`, `alpha-1.2.3`, `1.2.3.4`).

pub mod normalize;

pub use normalize::{BuildLabelPolicy, ParsedVersion, VersionNormalizer, normalize_version};
