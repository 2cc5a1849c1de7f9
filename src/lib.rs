//! dchb-cluster: population-stratified village clustering
//!
//! A library for splitting village census tables into population tiers,
//! standardizing domain indicators and profiling k-means clusters per tier.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
