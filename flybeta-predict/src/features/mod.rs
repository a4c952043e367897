//! Feature preparation for the scoring stages
//!
//! - [`row`]: derive a named numeric row from a joined record
//! - [`schema`]: declared, ordered per-stage field lists
//! - [`adapter`]: row + schema → ordered vector sent to the scoring service

pub mod adapter;
pub mod row;
pub mod schema;

pub use adapter::{FeatureAdapter, FeatureVector};
pub use row::FeatureRow;
pub use schema::{default_feature_order, FieldKind, FieldSpec, MissingFieldPolicy, StageSchema};
