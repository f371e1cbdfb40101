//! Generic dialect.

use super::Dialect;

/// A dialect using the defaults of every hook: ANSI quoting, `TABLE` and
/// `VIEW` listings, no schema support and no identity statement.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDialect;

impl GenericDialect {
    /// Creates a new generic dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }
}
