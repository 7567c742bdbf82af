use std::{path::Path, sync::Arc};

use super::{GridStackFormat, SourceError, SourceFormat};

/// A registry of source formats, looked up by file extension.
///
/// A registry is passed explicitly to constructors that open files by path.
/// Tests can register fake formats without affecting other callers.
#[derive(Clone, Debug, Default)]
pub struct FormatRegistry {
    formats: Vec<Arc<dyn SourceFormat>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the formats included in this crate.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new().with_format(Arc::new(GridStackFormat::new()))
    }

    /// Register `format`, replacing any format with the same name.
    pub fn register(&mut self, format: Arc<dyn SourceFormat>) {
        self.formats
            .retain(|registered| registered.name() != format.name());
        self.formats.push(format);
    }

    /// Register `format` and return the registry.
    #[must_use]
    pub fn with_format(mut self, format: Arc<dyn SourceFormat>) -> Self {
        self.register(format);
        self
    }

    /// The format named `name`.
    #[must_use]
    pub fn format(&self, name: &str) -> Option<Arc<dyn SourceFormat>> {
        self.formats
            .iter()
            .find(|format| format.name() == name)
            .cloned()
    }

    /// The registered formats, in registration order.
    #[must_use]
    pub fn formats(&self) -> &[Arc<dyn SourceFormat>] {
        &self.formats
    }

    /// The format for `path`, by file extension.
    ///
    /// If several formats share an extension, the most recently registered wins.
    ///
    /// # Errors
    /// Returns [`SourceError::UnsupportedFormat`] if no registered format handles the extension of `path`.
    pub fn for_path(&self, path: &Path) -> Result<Arc<dyn SourceFormat>, SourceError> {
        self.formats
            .iter()
            .rev()
            .find(|format| format.matches_extension(path))
            .cloned()
            .ok_or_else(|| SourceError::UnsupportedFormat(path.to_path_buf()))
    }
}
