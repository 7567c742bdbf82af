use derive_more::Display;

/// The canonical key of a layer.
///
/// Keys are normalised on creation:
/// surrounding whitespace is trimmed, and a leading `:` or leading `/` characters are removed.
/// So `"sm"`, `":sm"` and `"/sm"` all refer to the layer `sm`, while nested paths like `"/group/sm"` become `"group/sm"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Display)]
pub struct LayerKey(String);

impl LayerKey {
    /// Create a new normalised layer key.
    #[must_use]
    pub fn new(key: impl AsRef<str>) -> Self {
        let key = key.as_ref().trim();
        let key = key.strip_prefix(':').unwrap_or(key);
        Self(key.trim_start_matches('/').to_string())
    }

    /// The key as a [`&str`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the key is not empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

impl From<&str> for LayerKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for LayerKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<&String> for LayerKey {
    fn from(key: &String) -> Self {
        Self::new(key)
    }
}

impl From<&LayerKey> for LayerKey {
    fn from(key: &LayerKey) -> Self {
        key.clone()
    }
}

impl PartialEq<str> for LayerKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LayerKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
