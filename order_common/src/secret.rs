use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper for credentials (cache passwords, connection strings with embedded passwords etc.) that never prints
/// its contents.
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
    /// Returns the secret as an `Option`, treating the empty string as "no secret configured".
    pub fn non_empty(&self) -> Option<String> {
        if self.value.is_empty() {
            None
        } else {
            Some(self.value.clone())
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

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        let password = Secret::new("hunter2".to_string());
        assert_eq!(format!("{password}"), "****");
        assert_eq!(format!("{password:?}"), "****");
        assert_eq!(password.reveal(), "hunter2");
    }

    #[test]
    fn empty_secret_is_none() {
        assert_eq!(Secret::<String>::default().non_empty(), None);
        assert_eq!(Secret::new("pw".to_string()).non_empty(), Some("pw".to_string()));
    }
}
