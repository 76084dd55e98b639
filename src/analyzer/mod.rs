// Analyzer module: lowest-fare reduction and the two search modes built on it.

pub mod aggregator;
pub mod lowest_fare;

pub use aggregator::{FareAggregator, SearchSettings};
