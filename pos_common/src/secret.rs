use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper for configuration values (API secrets, SMTP passwords, webhook tokens) that must never end up in a log
/// line. Both `Debug` and `Display` print `****`. Use [`Secret::reveal`] at the point of use.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// True if no secret has been configured
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Returns `None` for blank secrets, so that optional secrets can be handled with combinators.
    pub fn reveal_non_empty(&self) -> Option<&str> {
        if self.is_empty() {
            None
        } else {
            Some(self.value.as_str())
        }
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
