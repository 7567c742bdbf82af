use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A dimension name.
///
/// Dimensions are matched by name across the layers of a stack.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Display)]
#[serde(transparent)]
pub struct DimensionName(String);

impl DimensionName {
    /// Create a new dimension name.
    #[must_use]
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self(name.into())
    }

    /// Get the dimension name as a [`&str`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DimensionName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for DimensionName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&String> for DimensionName {
    fn from(name: &String) -> Self {
        Self::new(name)
    }
}

impl From<&DimensionName> for DimensionName {
    fn from(name: &DimensionName) -> Self {
        name.clone()
    }
}

impl PartialEq<str> for DimensionName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DimensionName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
