//! Symbol resolution for the quote provider.
//!
//! Holdings keep the symbol the user typed. Before a batch lookup every
//! symbol is exchange-qualified by [`SymbolResolver::qualify`]; results are
//! keyed back to the holding symbol by the adapter.

mod exchange_suffixes;

pub use exchange_suffixes::{
    classify_symbol_currency, strip_exchange_suffix, CurrencyTag, SymbolResolver,
    DOMESTIC_EXCHANGE_SUFFIX,
};
