//! Stacks of layers.
//!
//! A [`Stack`] maps layer keys to dimensioned layers that share one set of dimensions.
//! Each layer uses a subset of the stack dimensions and has its own metadata and missing-value sentinel.
//!
//! A stack is backed by one of:
//! - in-memory arrays ([`Stack::from_layers`], [`Stack::from_named_layers`]),
//! - one file per layer ([`Stack::from_files`]), opened for every read, or
//! - a single multi-layer file ([`Stack::open`]), whose header is read on construction and whose data is read on demand.
//!   The file is opened for every read unless [`HandlePolicy::KeepOpen`] is used.
//!
//! Use a [`StackBuilder`] to override metadata, missing values, reference dimensions, the window or the handle policy.
//!
//! An optional [`Window`] restricts every read of a stack.
//! A read of a layer composes the window and an [`Indexer`] into a single [`ReadRegion`](crate::window::ReadRegion), so file-backed layers only read the requested elements.
//!
//! Stacks are [`Send`] and [`Sync`].
//! A file handle kept open by a stack is protected by a mutex, so concurrent reads of that stack are serialised.
//!
//! ```
//! # use ndarray::ArrayD;
//! # use rasterstack::{dimension::Dimension, layer::DimArray, stack::Stack, window::{Indexer, Selector}};
//! let x = Dimension::new("x", vec![0i64, 1, 2]);
//! let y = Dimension::new("y", vec![10.0, 20.0]);
//! let a = DimArray::new(ArrayD::zeros(vec![2, 3]), vec![y.clone(), x.clone()])?;
//! let b = DimArray::new(ArrayD::ones(vec![3]), vec![x])?;
//! let stack = Stack::from_named_layers([("a", a), ("b", b)])?;
//! assert_eq!(stack.names().collect::<Vec<_>>(), ["a", "b"]);
//! assert_eq!(stack.dims().len(), 2);
//!
//! let row = stack.read_layer("a", &Indexer::named([("y", Selector::at(20.0))]))?;
//! assert_eq!(row.shape(), &[3]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod concat;
mod stack_builder;
mod stack_errors;
mod stack_storage;

pub use concat::{concat, ConcatAxis};
pub use stack_builder::StackBuilder;
pub use stack_errors::StackError;
pub use stack_storage::HandlePolicy;

use std::path::Path;

use ndarray::ArrayViewMutD;

use crate::{
    dimension::{Dimension, DimensionName},
    layer::{DimArray, LayerKey},
    metadata::Metadata,
    source::FormatRegistry,
    window::{resolve_region, Indexer, Window},
};

use stack_storage::{StackStorage, StackStorageTraits};

/// The table entry of a layer.
#[derive(Debug, Clone)]
struct StackLayer {
    key: LayerKey,
    dims: Vec<DimensionName>,
    metadata: Metadata,
    missing_value: Option<f64>,
    size_bytes: Option<u64>,
}

/// A stack of layers sharing a set of dimensions.
#[derive(Debug, Clone)]
pub struct Stack {
    storage: StackStorage,
    dims: Vec<Dimension>,
    refdims: Vec<Dimension>,
    layers: Vec<StackLayer>,
    metadata: Metadata,
    window: Option<Window>,
}

impl Stack {
    /// Create an in-memory stack from named layers, keyed by their names.
    ///
    /// # Errors
    /// Returns a [`StackError`] if a layer is unnamed, keys are duplicated, or the layer dimensions are incompatible.
    pub fn from_layers(layers: impl IntoIterator<Item = DimArray>) -> Result<Self, StackError> {
        StackBuilder::new().build_from_layers(layers)
    }

    /// Create an in-memory stack from keys and layers.
    ///
    /// # Errors
    /// Returns a [`StackError`] if keys are duplicated or the layer dimensions are incompatible.
    pub fn from_named_layers<K: Into<LayerKey>>(
        layers: impl IntoIterator<Item = (K, DimArray)>,
    ) -> Result<Self, StackError> {
        StackBuilder::new().build_from_named_layers(layers)
    }

    /// Create a stack with one file per layer.
    ///
    /// # Errors
    /// Returns a [`StackError`] if a file cannot be opened, keys are duplicated, or the layer dimensions are incompatible.
    pub fn from_files<K: Into<LayerKey>, P: AsRef<Path>>(
        files: impl IntoIterator<Item = (K, P)>,
        registry: &FormatRegistry,
    ) -> Result<Self, StackError> {
        StackBuilder::new().build_from_files(files, registry)
    }

    /// Open a multi-layer file as a stack.
    ///
    /// # Errors
    /// Returns a [`StackError`] if the file cannot be opened or its header is invalid.
    pub fn open(path: impl AsRef<Path>, registry: &FormatRegistry) -> Result<Self, StackError> {
        StackBuilder::new().build_from_file(path.as_ref(), registry)
    }

    /// Open a multi-layer file as a stack with a [`HandlePolicy`].
    ///
    /// # Errors
    /// Returns a [`StackError`] if the file cannot be opened or its header is invalid.
    pub fn open_with_policy(
        path: impl AsRef<Path>,
        registry: &FormatRegistry,
        handle_policy: HandlePolicy,
    ) -> Result<Self, StackError> {
        StackBuilder::new()
            .handle_policy(handle_policy)
            .build_from_file(path.as_ref(), registry)
    }

    /// The layer keys, in insertion order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &LayerKey> {
        self.layers.iter().map(|layer| &layer.key)
    }

    /// The layer names, in insertion order.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.layers.iter().map(|layer| layer.key.as_str())
    }

    /// The number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the stack has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns true if the stack has the layer `key`.
    #[must_use]
    pub fn contains(&self, key: impl Into<LayerKey>) -> bool {
        let key = key.into();
        self.layers.iter().any(|layer| layer.key == key)
    }

    /// The stack dimensions.
    #[must_use]
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// The reference dimensions.
    #[must_use]
    pub fn refdims(&self) -> &[Dimension] {
        &self.refdims
    }

    /// The stack dimension named `name`.
    #[must_use]
    pub fn dim(&self, name: impl Into<DimensionName>) -> Option<&Dimension> {
        let name = name.into();
        self.dims.iter().find(|dimension| dimension.name() == &name)
    }

    /// The stack metadata.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The dimensions of the layer `key`, without the window applied.
    ///
    /// # Errors
    /// Returns [`StackError::KeyNotFound`] if the layer does not exist.
    pub fn layer_dims(&self, key: impl Into<LayerKey>) -> Result<Vec<&Dimension>, StackError> {
        Ok(self.layer_dimensions(self.stack_layer(&key.into())?))
    }

    /// The metadata of the layer `key`.
    ///
    /// # Errors
    /// Returns [`StackError::KeyNotFound`] if the layer does not exist.
    pub fn layer_metadata(&self, key: impl Into<LayerKey>) -> Result<&Metadata, StackError> {
        Ok(&self.stack_layer(&key.into())?.metadata)
    }

    /// The missing-value sentinel of the layer `key`.
    ///
    /// # Errors
    /// Returns [`StackError::KeyNotFound`] if the layer does not exist.
    pub fn missing_value(&self, key: impl Into<LayerKey>) -> Result<Option<f64>, StackError> {
        Ok(self.stack_layer(&key.into())?.missing_value)
    }

    /// The storage size of the layer `key` in bytes, if known.
    ///
    /// # Errors
    /// Returns [`StackError::KeyNotFound`] if the layer does not exist.
    pub fn layer_size(&self, key: impl Into<LayerKey>) -> Result<Option<u64>, StackError> {
        Ok(self.stack_layer(&key.into())?.size_bytes)
    }

    /// The window.
    #[must_use]
    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    /// Set the window and return the stack.
    ///
    /// Window selectors for dimensions a layer does not have are ignored by that layer.
    #[must_use]
    pub fn with_window(mut self, window: Option<Window>) -> Self {
        self.window = window;
        self
    }

    /// Set the window.
    pub fn set_window(&mut self, window: Option<Window>) -> &mut Self {
        self.window = window;
        self
    }

    /// The handle policy of a stack backed by a single multi-layer file.
    #[must_use]
    pub fn handle_policy(&self) -> Option<HandlePolicy> {
        match &self.storage {
            StackStorage::Source(source) => Some(source.policy()),
            StackStorage::Memory(_) | StackStorage::Files(_) => None,
        }
    }

    /// The path of a stack backed by a single multi-layer file.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        match &self.storage {
            StackStorage::Source(source) => Some(source.path()),
            StackStorage::Memory(_) | StackStorage::Files(_) => None,
        }
    }

    /// Read the layer `key` through the window.
    ///
    /// # Errors
    /// Returns a [`StackError`] if the layer does not exist, the window cannot be resolved, or the read fails.
    pub fn layer(&self, key: impl Into<LayerKey>) -> Result<DimArray, StackError> {
        self.read_layer(key, &Indexer::all())
    }

    /// Read a subset of the layer `key` through the window.
    ///
    /// The window and `indexer` are composed into one read region, and only that region is read from storage.
    /// Axes removed by scalar selectors are appended to the reference dimensions of the result.
    ///
    /// # Errors
    /// Returns a [`StackError`] if
    /// - the layer does not exist,
    /// - a named selector of `indexer` refers to a dimension that is not a stack dimension,
    /// - the window or indexer cannot be resolved, or
    /// - the read fails.
    pub fn read_layer(
        &self,
        key: impl Into<LayerKey>,
        indexer: &Indexer,
    ) -> Result<DimArray, StackError> {
        let key = key.into();
        let layer = self.stack_layer(&key)?;
        indexer.check_dimensions(&self.dims)?;
        let layer_dims: Vec<Dimension> =
            self.layer_dimensions(layer).into_iter().cloned().collect();
        let (region, dims, refdims) =
            resolve_region(&layer_dims, self.window.as_ref(), indexer)?.into_parts();
        tracing::trace!(layer = %key, elements = region.num_elements(), "reading layer");
        let data = self.storage.read_region(&key, &region)?;
        Ok(DimArray::new(data, dims)?
            .with_name(key)
            .with_metadata(layer.metadata.clone())
            .with_missing_value(layer.missing_value)
            .with_refdims(self.refdims.iter().cloned().chain(refdims).collect()))
    }

    /// Apply `indexer` to every layer, returning an in-memory stack of the results.
    ///
    /// Layers reduced to a single element become 0-dimensional layers.
    /// The result keeps the stack metadata and has no window.
    ///
    /// # Errors
    /// Returns a [`StackError`] if a layer cannot be read.
    pub fn slice(&self, indexer: &Indexer) -> Result<Self, StackError> {
        let layers = self
            .layers
            .iter()
            .map(|layer| self.read_layer(&layer.key, indexer))
            .collect::<Result<Vec<_>, _>>()?;
        let mut stack = StackBuilder::new()
            .metadata(self.metadata.clone())
            .build_from_layers(layers)?;
        stack.dims.sort_by_key(|dimension| {
            self.dims
                .iter()
                .position(|existing| existing.name() == dimension.name())
        });
        Ok(stack)
    }

    /// Copy every layer into new in-memory storage.
    ///
    /// The window is applied to each layer, so the copy has no window.
    /// Changes to the copy do not affect this stack.
    ///
    /// # Errors
    /// Returns a [`StackError`] if a layer cannot be read.
    pub fn deep_copy(&self) -> Result<Self, StackError> {
        self.slice(&Indexer::all())
    }

    /// A mutable view of the data of the in-memory layer `key`, without the window applied.
    ///
    /// # Errors
    /// Returns [`StackError::KeyNotFound`] if the layer does not exist, or [`StackError::UnsupportedOperation`] if the stack is file-backed.
    pub fn data_mut(
        &mut self,
        key: impl Into<LayerKey>,
    ) -> Result<ArrayViewMutD<'_, f64>, StackError> {
        let key = key.into();
        self.stack_layer(&key)?;
        match &mut self.storage {
            StackStorage::Memory(storage) => storage
                .array_mut(&key)
                .ok_or(StackError::KeyNotFound(key)),
            StackStorage::Files(_) | StackStorage::Source(_) => Err(
                StackError::UnsupportedOperation("file-backed layers are read only".to_string()),
            ),
        }
    }

    fn stack_layer(&self, key: &LayerKey) -> Result<&StackLayer, StackError> {
        self.layers
            .iter()
            .find(|layer| &layer.key == key)
            .ok_or_else(|| StackError::KeyNotFound(key.clone()))
    }

    fn layer_dimensions(&self, layer: &StackLayer) -> Vec<&Dimension> {
        layer
            .dims
            .iter()
            .filter_map(|name| self.dims.iter().find(|dimension| dimension.name() == name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, ArrayD};

    use crate::window::Selector;

    use super::*;

    fn stack() -> Stack {
        let x = Dimension::new("x", vec![0i64, 1, 2]);
        let y = Dimension::new("y", vec![10.0, 20.0]);
        let time = Dimension::new("time", vec![1i64, 2]);
        let a = DimArray::new(
            Array::from_shape_vec((2, 3), (0..6).map(f64::from).collect())
                .unwrap()
                .into_dyn(),
            vec![y.clone(), x.clone()],
        )
        .unwrap()
        .with_missing_value(Some(-1.0));
        let b = DimArray::new(
            Array::from_shape_vec((2, 3, 2), (0..12).map(f64::from).collect())
                .unwrap()
                .into_dyn(),
            vec![y, x, time],
        )
        .unwrap();
        Stack::from_named_layers([(":a", a), ("/b", b)]).unwrap()
    }

    #[test]
    fn stack_dims_union() {
        let stack = stack();
        assert_eq!(stack.len(), 2);
        assert!(stack.contains("a"));
        assert_eq!(stack.names().collect::<Vec<_>>(), ["a", "b"]);
        let names: Vec<&str> = stack.dims().iter().map(|d| d.name().as_str()).collect();
        assert_eq!(names, ["y", "x", "time"]);
        let a = stack.layer("a").unwrap();
        assert_eq!(a.dims().len(), 2);
        assert_eq!(stack.layer_dims("b").unwrap().len(), 3);
        assert_eq!(stack.missing_value("a").unwrap(), Some(-1.0));
        assert_eq!(stack.layer_size("a").unwrap(), Some(48));
        assert!(matches!(stack.layer("c"), Err(StackError::KeyNotFound(_))));
    }

    #[test]
    fn stack_duplicate_keys() {
        let layer = DimArray::new(ArrayD::zeros(vec![1]), vec![Dimension::new("x", vec![0i64])])
            .unwrap();
        assert!(matches!(
            Stack::from_named_layers([("a", layer.clone()), (":a", layer.clone())]),
            Err(StackError::DuplicateKey(_))
        ));
        assert!(matches!(
            Stack::from_named_layers([(" : ", layer.clone())]),
            Err(StackError::EmptyLayerKey(0))
        ));
        assert!(matches!(
            Stack::from_layers([layer]),
            Err(StackError::UnnamedLayer(0))
        ));
    }

    #[test]
    fn stack_window() {
        let stack = stack().with_window(Some(Window::named([("x", Selector::Range(1..3))])));
        let a = stack.layer("a").unwrap();
        assert_eq!(a.shape(), &[2, 2]);
        assert_eq!(a.data().as_slice().unwrap(), &[1.0, 2.0, 4.0, 5.0]);

        // The indexer is resolved against the windowed axis
        let b = stack
            .read_layer(
                "b",
                &Indexer::named([("x", Selector::Index(0)), ("time", Selector::Index(1))]),
            )
            .unwrap();
        assert_eq!(b.data().as_slice().unwrap(), &[3.0, 9.0]);
        assert_eq!(b.refdims().len(), 2);

        // A stack dimension that layer a lacks is ignored, an unknown dimension is an error
        assert!(stack
            .read_layer("a", &Indexer::named([("time", Selector::Index(0))]))
            .is_ok());
        assert!(stack
            .read_layer("a", &Indexer::named([("z", Selector::Index(0))]))
            .is_err());
    }

    #[test]
    fn stack_slice() {
        let stack = stack();
        let sliced = stack
            .slice(&Indexer::named([("y", Selector::Index(1)), ("x", Selector::Index(2))]))
            .unwrap();
        assert_eq!(sliced.layer("a").unwrap().shape(), &[] as &[usize]);
        assert_eq!(sliced.layer("a").unwrap().data().first(), Some(&5.0));
        assert_eq!(sliced.layer("b").unwrap().shape(), &[2]);
        assert_eq!(sliced.dims().len(), 1);
        assert_eq!(sliced.refdims().len(), 2);
        assert!(sliced.window().is_none());
    }

    #[test]
    fn stack_deep_copy() {
        let index: &[usize] = &[0, 1];
        let mut stack = stack();
        let mut copy = stack.deep_copy().unwrap();
        assert_eq!(copy.layer("b").unwrap(), stack.layer("b").unwrap());
        assert_eq!(copy.dims(), stack.dims());
        copy.data_mut("a").unwrap().fill(7.0);
        assert_eq!(stack.layer("a").unwrap().data()[index], 1.0);
        stack.data_mut("a").unwrap()[index] = 9.0;
        assert_eq!(copy.layer("a").unwrap().data()[index], 7.0);
        assert_eq!(stack.layer("a").unwrap().data()[index], 9.0);
    }
}
