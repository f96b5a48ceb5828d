//! Quote provider abstractions and implementations.
//!
//! This module contains:
//! - The `QuoteProvider` trait that all providers implement
//! - The dashboard backend's batch price endpoint
//!
//! Providers receive pre-qualified symbols. Resolution from the holding
//! symbol to the provider symbol happens in the resolver module, not in the
//! providers themselves.

mod traits;

pub mod dashboard;

// Re-exports
pub use traits::QuoteProvider;
