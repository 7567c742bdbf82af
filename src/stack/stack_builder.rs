use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use crate::{
    config::global_config,
    dimension::{combine_dimensions, Dimension, DimensionError},
    layer::{DimArray, LayerKey},
    metadata::Metadata,
    source::{open_and_read, FormatRegistry, LayerInfo, SourceFormat},
    window::Window,
};

use super::{
    stack_storage::{FileLayer, FileSource, FilesStorage, MemoryStorage, StackStorage},
    HandlePolicy, Stack, StackError, StackLayer,
};

/// A [`Stack`] builder.
///
/// By default, the stack metadata, per-layer metadata, missing values and reference dimensions are taken from the layers or source files, the stack has no window, and the handle policy is [`Config::default_handle_policy`](crate::config::Config::default_handle_policy).
///
/// ```
/// # use ndarray::ArrayD;
/// # use rasterstack::{dimension::Dimension, layer::DimArray, stack::StackBuilder};
/// let layer = DimArray::new(ArrayD::zeros(vec![3]), vec![Dimension::new("x", vec![0i64, 1, 2])])?;
/// let stack = StackBuilder::new()
///     .missing_value("sm", Some(-9999.0))
///     .build_from_named_layers([("sm", layer)])?;
/// assert_eq!(stack.missing_value("sm")?, Some(-9999.0));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct StackBuilder {
    metadata: Option<Metadata>,
    layer_metadata: Vec<(LayerKey, Metadata)>,
    missing_values: Vec<(LayerKey, Option<f64>)>,
    refdims: Option<Vec<Dimension>>,
    window: Option<Window>,
    handle_policy: HandlePolicy,
}

impl Default for StackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StackBuilder {
    /// Create a new stack builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: None,
            layer_metadata: Vec::new(),
            missing_values: Vec::new(),
            refdims: None,
            window: None,
            handle_policy: global_config().default_handle_policy(),
        }
    }

    /// Set the stack metadata.
    ///
    /// If left unmodified, the metadata is empty, or the attributes of a multi-layer file.
    pub fn metadata(&mut self, metadata: Metadata) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the metadata of the layer `key`.
    ///
    /// If left unmodified, the metadata of a layer is taken from the layer or its source.
    pub fn layer_metadata(&mut self, key: impl Into<LayerKey>, metadata: Metadata) -> &mut Self {
        self.layer_metadata.push((key.into(), metadata));
        self
    }

    /// Set the missing-value sentinel of the layer `key`.
    ///
    /// If left unmodified, the missing value of a layer is taken from the layer or its source.
    pub fn missing_value(
        &mut self,
        key: impl Into<LayerKey>,
        missing_value: Option<f64>,
    ) -> &mut Self {
        self.missing_values.push((key.into(), missing_value));
        self
    }

    /// Set the reference dimensions.
    ///
    /// If left unmodified, in-memory stacks combine the reference dimensions of their layers and file-backed stacks have none.
    pub fn refdims(&mut self, refdims: Vec<Dimension>) -> &mut Self {
        self.refdims = Some(refdims);
        self
    }

    /// Set the window.
    pub fn window(&mut self, window: Option<Window>) -> &mut Self {
        self.window = window;
        self
    }

    /// Set the handle policy of a stack backed by a single multi-layer file.
    pub fn handle_policy(&mut self, handle_policy: HandlePolicy) -> &mut Self {
        self.handle_policy = handle_policy;
        self
    }

    /// Build an in-memory stack from named layers, keyed by their names.
    ///
    /// # Errors
    /// Returns [`StackError::UnnamedLayer`] if a layer has no name, or any error of [`build_from_named_layers`](Self::build_from_named_layers).
    pub fn build_from_layers(
        &self,
        layers: impl IntoIterator<Item = DimArray>,
    ) -> Result<Stack, StackError> {
        let layers = layers
            .into_iter()
            .enumerate()
            .map(|(index, layer)| {
                let key = layer.name().cloned();
                key.map(|key| (key, layer))
                    .ok_or(StackError::UnnamedLayer(index))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.build_from_named_layers(layers)
    }

    /// Build an in-memory stack from keys and layers.
    ///
    /// The stack dimensions are the union of the layer dimensions, in order of first appearance.
    ///
    /// # Errors
    /// Returns a [`StackError`] if
    /// - a key is empty or duplicated after normalisation,
    /// - layers have different dimensions with the same name, or
    /// - an override refers to a missing layer.
    pub fn build_from_named_layers<K: Into<LayerKey>>(
        &self,
        layers: impl IntoIterator<Item = (K, DimArray)>,
    ) -> Result<Stack, StackError> {
        let mut keys = HashSet::new();
        let mut arrays = HashMap::new();
        let mut stack_layers = Vec::new();
        let mut dimension_sets = Vec::new();
        let mut refdim_sets = Vec::new();
        for (index, (key, layer)) in layers.into_iter().enumerate() {
            let key = insert_key(&mut keys, key.into(), index)?;
            stack_layers.push(StackLayer {
                key: key.clone(),
                dims: layer.dims().iter().map(|d| d.name().clone()).collect(),
                metadata: layer.metadata().clone(),
                missing_value: layer.missing_value(),
                size_bytes: Some((layer.data().len() * std::mem::size_of::<f64>()) as u64),
            });
            dimension_sets.push(layer.dims().to_vec());
            refdim_sets.push(layer.refdims().to_vec());
            arrays.insert(key, layer.into_data());
        }
        let dims = combine_dimensions(dimension_sets.iter().map(Vec::as_slice))?;
        let refdims = combine_dimensions(refdim_sets.iter().map(Vec::as_slice))?;
        self.assemble(
            StackStorage::Memory(MemoryStorage::new(arrays)),
            dims,
            refdims,
            stack_layers,
            Metadata::new(),
        )
    }

    /// Build a stack with one file per layer.
    ///
    /// The format of each file is looked up in `registry`.
    /// A file holding several layers must hold one with the same key as its entry.
    /// The stack dimensions are combined from the dimensions of each layer.
    ///
    /// # Errors
    /// Returns a [`StackError`] if
    /// - a key is empty or duplicated after normalisation,
    /// - a file cannot be opened or has no format in `registry`,
    /// - a file holds several layers and none has the key of its entry,
    /// - layers have different dimensions with the same name, or
    /// - an override refers to a missing layer.
    pub fn build_from_files<K: Into<LayerKey>, P: AsRef<Path>>(
        &self,
        files: impl IntoIterator<Item = (K, P)>,
        registry: &FormatRegistry,
    ) -> Result<Stack, StackError> {
        let mut keys = HashSet::new();
        let mut file_layers = HashMap::new();
        let mut stack_layers = Vec::new();
        let mut dimension_sets = Vec::new();
        for (index, (key, path)) in files.into_iter().enumerate() {
            let key = insert_key(&mut keys, key.into(), index)?;
            let path = path.as_ref();
            let format = registry.for_path(path)?;
            let (source_key, info, layer_dims) =
                open_and_read(format.as_ref(), path, |handle| {
                    let source_keys = handle.layer_keys()?;
                    let source_key = match source_keys.as_slice() {
                        [single] => single.clone(),
                        _ if source_keys.contains(&key) => key.clone(),
                        _ => {
                            return Err(StackError::AmbiguousLayer {
                                path: path.to_path_buf(),
                                key: key.clone(),
                            })
                        }
                    };
                    let info = handle.layer_info(&source_key)?;
                    let layer_dims = layer_dimensions(&key, &info, &handle.dimensions()?)?;
                    Ok((source_key, info, layer_dims))
                })?;
            stack_layers.push(StackLayer {
                key: key.clone(),
                size_bytes: Some(info.size_bytes()),
                dims: info.dimensions,
                metadata: info.metadata,
                missing_value: info.missing_value,
            });
            dimension_sets.push(layer_dims);
            file_layers.insert(
                key,
                FileLayer {
                    path: path.to_path_buf(),
                    format,
                    source_key,
                },
            );
        }
        let dims = combine_dimensions(dimension_sets.iter().map(Vec::as_slice))?;
        self.assemble(
            StackStorage::Files(FilesStorage::new(file_layers)),
            dims,
            Vec::new(),
            stack_layers,
            Metadata::new(),
        )
    }

    /// Build a stack from a multi-layer file, with the format for `path` in `registry`.
    ///
    /// # Errors
    /// Returns a [`StackError`] if `registry` has no format for `path`, or any error of [`build_from_source`](Self::build_from_source).
    pub fn build_from_file(
        &self,
        path: &Path,
        registry: &FormatRegistry,
    ) -> Result<Stack, StackError> {
        self.build_from_source(path, registry.for_path(path)?)
    }

    /// Build a stack from a multi-layer file with `format`.
    ///
    /// The file is opened once to read its layer keys, dimensions, attributes and layer information.
    /// Layer data is read on demand.
    ///
    /// # Errors
    /// Returns a [`StackError`] if
    /// - the file cannot be opened or its header is invalid,
    /// - a layer key is empty or duplicated,
    /// - a layer uses a dimension the file does not have, or
    /// - an override refers to a missing layer.
    pub fn build_from_source(
        &self,
        path: &Path,
        format: Arc<dyn SourceFormat>,
    ) -> Result<Stack, StackError> {
        let handle = format.open(path)?;
        tracing::trace!(path = %path.display(), format = format.name(), "opened source");
        let dims = handle.dimensions()?;
        let attributes = handle.attributes()?;
        let mut keys = HashSet::new();
        let mut stack_layers = Vec::new();
        for (index, key) in handle.layer_keys()?.into_iter().enumerate() {
            let key = insert_key(&mut keys, key, index)?;
            let info = handle.layer_info(&key)?;
            layer_dimensions(&key, &info, &dims)?;
            stack_layers.push(StackLayer {
                key,
                size_bytes: Some(info.size_bytes()),
                dims: info.dimensions,
                metadata: info.metadata,
                missing_value: info.missing_value,
            });
        }
        let source = FileSource::new(path, format, self.handle_policy, handle);
        self.assemble(
            StackStorage::Source(Arc::new(source)),
            dims,
            Vec::new(),
            stack_layers,
            attributes,
        )
    }

    fn assemble(
        &self,
        storage: StackStorage,
        dims: Vec<Dimension>,
        refdims: Vec<Dimension>,
        mut layers: Vec<StackLayer>,
        metadata: Metadata,
    ) -> Result<Stack, StackError> {
        for (key, metadata) in &self.layer_metadata {
            find_layer(&mut layers, key)?.metadata = metadata.clone();
        }
        for (key, missing_value) in &self.missing_values {
            find_layer(&mut layers, key)?.missing_value = *missing_value;
        }
        for layer in &layers {
            if let Some(dimension) = layer
                .dims
                .iter()
                .find(|name| !dims.iter().any(|dimension| dimension.name() == *name))
            {
                return Err(StackError::UnknownLayerDimension {
                    layer: layer.key.clone(),
                    dimension: dimension.clone(),
                });
            }
        }

        let stack = Stack {
            storage,
            dims,
            refdims: self.refdims.clone().unwrap_or(refdims),
            layers,
            metadata: self.metadata.clone().unwrap_or(metadata),
            window: self.window.clone(),
        };
        tracing::debug!(
            layers = stack.len(),
            dims = stack.dims.len(),
            storage = match &stack.storage {
                StackStorage::Memory(_) => "memory",
                StackStorage::Files(_) => "files",
                StackStorage::Source(_) => "source",
            },
            "constructed stack"
        );
        Ok(stack)
    }
}

fn find_layer<'a>(
    layers: &'a mut [StackLayer],
    key: &LayerKey,
) -> Result<&'a mut StackLayer, StackError> {
    layers
        .iter_mut()
        .find(|layer| &layer.key == key)
        .ok_or_else(|| StackError::KeyNotFound(key.clone()))
}

fn insert_key(
    keys: &mut HashSet<LayerKey>,
    key: LayerKey,
    index: usize,
) -> Result<LayerKey, StackError> {
    if !key.is_valid() {
        return Err(StackError::EmptyLayerKey(index));
    }
    if !keys.insert(key.clone()) {
        return Err(StackError::DuplicateKey(key));
    }
    Ok(key)
}

/// The dimensions of a layer, checked against its shape.
fn layer_dimensions(
    key: &LayerKey,
    info: &LayerInfo,
    dimensions: &[Dimension],
) -> Result<Vec<Dimension>, StackError> {
    if info.dimensions.len() != info.shape.len() {
        return Err(DimensionError::DimensionalityMismatch {
            expected: info.shape.len(),
            got: info.dimensions.len(),
        }
        .into());
    }
    std::iter::zip(&info.dimensions, &info.shape)
        .map(|(name, length)| -> Result<Dimension, StackError> {
            let dimension = dimensions
                .iter()
                .find(|dimension| dimension.name() == name)
                .ok_or_else(|| StackError::UnknownLayerDimension {
                    layer: key.clone(),
                    dimension: name.clone(),
                })?;
            if dimension.len() == *length {
                Ok(dimension.clone())
            } else {
                Err(DimensionError::LengthMismatch {
                    dimension: name.clone(),
                    expected: dimension.len(),
                    got: *length,
                }
                .into())
            }
        })
        .collect()
}
