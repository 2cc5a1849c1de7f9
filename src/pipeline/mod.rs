//! Pipeline module - the population-stratified clustering stages

pub mod aggregate;
pub mod domain;
pub mod error;
pub mod kmeans;
pub mod loader;
pub mod runner;
pub mod scaler;
pub mod schema;
pub mod tiers;
pub mod transform;

pub use aggregate::*;
pub use domain::*;
pub use error::*;
pub use kmeans::{ElbowPoint, KMeansConfig, KMeansFit};
pub use loader::*;
pub use runner::*;
pub use scaler::*;
pub use schema::{ResolvedImpute, ResolvedSchema, ResolvedTier};
pub use tiers::*;
pub use transform::*;
