//! Quotes module - the latest known quote per held symbol.

mod quote_book;

pub use quote_book::{ApplyReport, QuoteBook};
