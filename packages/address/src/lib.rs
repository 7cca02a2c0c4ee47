#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Taiwanese address understanding.
//!
//! [`parser`] splits an address into its region hierarchy and
//! [`variants`] turns it into an ordered list of geocoder queries, from
//! the full address down to the city. Lookup data (landmarks,
//! abbreviations, English terms and renderings) lives in TOML assets
//! under `data/`, loaded through [`tables`].

pub mod parser;
pub mod tables;
pub mod variants;

pub use parser::{AddressStructure, InterpolationKind, parse};
pub use tables::EntityKind;
pub use variants::{DEFAULT_MAX_VARIANTS, RecognizedEntity, VariantSet, generate};
