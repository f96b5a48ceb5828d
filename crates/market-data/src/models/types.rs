use std::borrow::Cow;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Currency code (ISO 4217) - mostly static
pub type Currency = Cow<'static, str>;

/// Exchange-qualified symbol as sent to a provider (e.g. "005930.KS")
pub type ProviderSymbol = String;
