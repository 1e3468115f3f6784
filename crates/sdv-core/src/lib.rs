//! # sdv-core — Foundational Types for the Sample-Data Validator
//!
//! Every other crate in the workspace depends on `sdv-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Structured identity, never bare strings.** `SchemaIdentity` is the
//!    join key between schema documents and sample documents. Its version is
//!    a parsed `SchemaVersion`, so `1.0` and `01.0` are the same key.
//!
//! 2. **One narrow parsing seam.** The path convention that encodes identity
//!    and expected outcome is parsed only by [`path::parse_sample_location`]
//!    and the [`layout::SchemaLocator`] trait. Replacing the convention (for
//!    example with a manifest file) touches nothing downstream.
//!
//! 3. **Offset-preserving timestamps.** [`OffsetTimestamp`] keeps the offset it
//!    was parsed with and always renders a seconds field.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sdv-*` crates.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod layout;
pub mod path;
pub mod temporal;

pub use error::{MalformedPathError, VersionParseError};
pub use identity::{ExpectedOutcome, SchemaIdentity, SchemaVersion};
pub use layout::{SchemaLayout, SchemaLocator};
pub use path::{parse_sample_location, SamplePath};
pub use temporal::OffsetTimestamp;
