//! Secret redaction for private keys in logs and debug output.
//!
//! [`Redacted`] never exposes its inner value through `Debug` or `Display`;
//! callers that need the secret ask for it explicitly with [`Redacted::expose`].

use std::fmt::{self, Debug, Display};

/// Wrapper that redacts its inner value when formatted.
///
/// ```ignore
/// use lockbridge::redact::Redacted;
///
/// let key = Redacted::new("0xac09...".to_string());
/// tracing::info!(key = %key, "Loaded key");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Redacted<T>(T);

impl<T> Redacted<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the secret value
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_hides_value() {
        let secret = Redacted::new("0xdeadbeef".to_string());
        assert_eq!(format!("{}", secret), "<redacted>");
        assert_eq!(format!("{:?}", secret), "<redacted>");
        assert_eq!(secret.expose(), "0xdeadbeef");
    }
}
