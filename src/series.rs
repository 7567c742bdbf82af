//! Series of stacks along an additional dimension.
//!
//! A [`Series`] is an ordered sequence of [`Stack`]s, indexed by a series [`Dimension`] (typically time).
//! A series is built from the files of a directory or a list of paths with a [`SeriesBuilder`], or from in-memory stacks with [`Series::from_stacks`].
//!
//! Each file path is parsed into a series coordinate by [`SourceFormat::parse_path_coordinate`].
//! Files without a parseable coordinate are skipped and reported in [`SeriesScan::skipped`].
//! Elements are materialised on first access unless the series is built [eagerly](SeriesBuilder::eager).
//!
//! Every element of a series has the same set of layer keys as the first element.

mod series_errors;

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use derive_more::Display;
use parking_lot::Mutex;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;
use walkdir::WalkDir;

pub use series_errors::SeriesError;

use crate::{
    config::global_config,
    dimension::{CoordinateValue, Coordinates, Dimension, DimensionError, DimensionName, Sampling},
    layer::{DimArray, LayerKey},
    source::{MalformedPathError, SourceFormat},
    stack::{concat, ConcatAxis, HandlePolicy, Stack, StackBuilder},
    window::{Indexer, Window},
};

/// The order of the elements of a series built from paths.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum SeriesOrder {
    /// Elements are sorted by their series coordinate.
    ///
    /// The sort is stable, so elements with equal coordinates keep their listing order.
    #[default]
    Coordinate,
    /// Elements are kept in the order the paths were listed.
    ///
    /// Directory listings are sorted by file name.
    Listing,
}

/// The outcome of building a series from paths.
#[derive(Debug)]
pub struct SeriesScan {
    /// The series.
    pub series: Series,
    /// The paths that were skipped because their coordinate could not be parsed.
    pub skipped: Vec<MalformedPathError>,
}

/// Opens the stack of a lazy series element.
#[derive(Debug)]
struct StackLoader {
    format: Arc<dyn SourceFormat>,
    window: Option<Window>,
    handle_policy: HandlePolicy,
}

impl StackLoader {
    fn load(&self, path: &Path) -> Result<Stack, SeriesError> {
        Ok(StackBuilder::new()
            .window(self.window.clone())
            .handle_policy(self.handle_policy)
            .build_from_source(path, self.format.clone())?)
    }
}

#[derive(Debug)]
enum SeriesElement {
    Stack(Arc<Stack>),
    Lazy {
        path: PathBuf,
        loader: Arc<StackLoader>,
        stack: Mutex<Option<Arc<Stack>>>,
    },
}

/// An ordered sequence of stacks along a series dimension.
///
/// A series is [`Send`] and [`Sync`].
/// Distinct elements may be materialised concurrently.
#[derive(Debug)]
pub struct Series {
    dim: Dimension,
    elements: Vec<SeriesElement>,
}

impl Series {
    /// Create a series from in-memory stacks, one per coordinate of `dim`.
    ///
    /// # Errors
    /// Returns a [`SeriesError`] if
    /// - the number of stacks is not the length of `dim`,
    /// - `stacks` is empty, or
    /// - the stacks do not all have the same layer keys.
    pub fn from_stacks(
        dim: Dimension,
        stacks: impl IntoIterator<Item = Stack>,
    ) -> Result<Self, SeriesError> {
        let stacks: Vec<Arc<Stack>> = stacks.into_iter().map(Arc::new).collect();
        if stacks.len() != dim.len() {
            return Err(SeriesError::LengthMismatch {
                expected: dim.len(),
                got: stacks.len(),
            });
        }
        let Some(first) = stacks.first() else {
            return Err(SeriesError::EmptySeries { skipped: 0 });
        };
        let expected = key_set(first);
        for (index, stack) in stacks.iter().enumerate().skip(1) {
            check_keys(&expected, stack, index)?;
        }
        Ok(Self {
            dim,
            elements: stacks.into_iter().map(SeriesElement::Stack).collect(),
        })
    }

    /// The number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the series has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The series dimension.
    #[must_use]
    pub fn dim(&self) -> &Dimension {
        &self.dim
    }

    /// The source path of element `index`, or [`None`] for in-memory elements.
    #[must_use]
    pub fn path(&self, index: usize) -> Option<&Path> {
        match self.elements.get(index)? {
            SeriesElement::Stack(_) => None,
            SeriesElement::Lazy { path, .. } => Some(path),
        }
    }

    /// Returns true if element `index` has been materialised.
    #[must_use]
    pub fn is_materialized(&self, index: usize) -> bool {
        match self.elements.get(index) {
            Some(SeriesElement::Stack(_)) => true,
            Some(SeriesElement::Lazy { stack, .. }) => stack.lock().is_some(),
            None => false,
        }
    }

    /// Get the stack of element `index`, materialising it if needed.
    ///
    /// Materialising a file-backed element reads the file header only.
    ///
    /// # Errors
    /// Returns a [`SeriesError`] if
    /// - `index` is out of bounds,
    /// - the stack cannot be opened, or
    /// - the layer keys of the stack differ from those of the first element.
    pub fn stack(&self, index: usize) -> Result<Arc<Stack>, SeriesError> {
        let element = self
            .elements
            .get(index)
            .ok_or(SeriesError::IndexOutOfBounds {
                index,
                len: self.len(),
            })?;
        let (path, loader, cached) = match element {
            SeriesElement::Stack(stack) => return Ok(stack.clone()),
            SeriesElement::Lazy {
                path,
                loader,
                stack,
            } => (path, loader, stack),
        };
        let mut cached = cached.lock();
        if let Some(stack) = cached.as_ref() {
            return Ok(stack.clone());
        }
        let stack = Arc::new(loader.load(path)?);
        if index > 0 {
            check_keys(&key_set(&*self.stack(0)?), &stack, index)?;
        }
        tracing::debug!(index, path = %path.display(), "materialized series element");
        *cached = Some(stack.clone());
        Ok(stack)
    }

    /// Read layer `key` of element `index` through `indexer`.
    ///
    /// Only the requested region of the layer is read.
    ///
    /// # Errors
    /// Returns a [`SeriesError`] if the element cannot be materialised or the read fails.
    pub fn read(
        &self,
        index: usize,
        key: impl Into<LayerKey>,
        indexer: &Indexer,
    ) -> Result<DimArray, SeriesError> {
        Ok(self.stack(index)?.read_layer(key, indexer)?)
    }

    /// Materialise every element, up to the [series concurrent limit](crate::config::Config#series-concurrent-limit) at a time.
    ///
    /// # Errors
    /// Returns a [`SeriesError`] if any element cannot be materialised.
    pub fn materialize(&self) -> Result<(), SeriesError> {
        // The first element is the layer key reference for all others.
        self.stack(0)?;
        let concurrent_limit = global_config().series_concurrent_limit().max(1);
        iter_concurrent_limit!(concurrent_limit, (1..self.len()), try_for_each, |index| {
            self.stack(index).map(|_| ())
        })
    }

    /// Combine the elements into one stack along the series dimension.
    ///
    /// The series dimension is appended after the dimensions of each layer.
    /// If `keys` is [`None`], every layer is combined.
    ///
    /// # Errors
    /// Returns a [`SeriesError`] if an element cannot be materialised or the layers cannot be concatenated.
    pub fn combine(&self, keys: Option<&[LayerKey]>) -> Result<Stack, SeriesError> {
        let stacks = (0..self.len())
            .map(|index| self.stack(index))
            .collect::<Result<Vec<_>, _>>()?;
        let stacks: Vec<&Stack> = stacks.iter().map(AsRef::as_ref).collect();
        Ok(concat(&stacks, keys, &ConcatAxis::New(self.dim.clone()))?)
    }
}

fn key_set(stack: &Stack) -> BTreeSet<LayerKey> {
    stack.keys().cloned().collect()
}

fn check_keys(
    expected: &BTreeSet<LayerKey>,
    stack: &Stack,
    index: usize,
) -> Result<(), SeriesError> {
    let got = key_set(stack);
    if &got == expected {
        Ok(())
    } else {
        Err(SeriesError::LayerMismatch {
            index,
            expected: expected.clone(),
            got,
        })
    }
}

/// A [`Series`] builder.
///
/// The builder produces series of stacks opened from files of one [`SourceFormat`].
///
/// ```
/// # use std::sync::Arc;
/// # use rasterstack::series::{SeriesBuilder, SeriesOrder};
/// # use rasterstack::source::MemoryFormat;
/// let format = Arc::new(MemoryFormat::new());
/// let mut builder = SeriesBuilder::new(format);
/// builder.dimension_name("date").order(SeriesOrder::Listing);
/// ```
#[derive(Debug)]
pub struct SeriesBuilder {
    format: Arc<dyn SourceFormat>,
    dimension_name: DimensionName,
    sampling: Option<Sampling>,
    order: SeriesOrder,
    eager: bool,
    window: Option<Window>,
    handle_policy: HandlePolicy,
}

impl SeriesBuilder {
    /// Create a new series builder for files of `format`.
    ///
    /// The series dimension is named `time`, point sampled, and ordered by the [series order](crate::config::Config#series-order) configuration.
    #[must_use]
    pub fn new(format: Arc<dyn SourceFormat>) -> Self {
        let config = global_config();
        Self {
            format,
            dimension_name: DimensionName::new("time"),
            sampling: None,
            order: config.series_order(),
            eager: false,
            window: None,
            handle_policy: config.default_handle_policy(),
        }
    }

    /// Set the name of the series dimension.
    pub fn dimension_name(&mut self, name: impl Into<DimensionName>) -> &mut Self {
        self.dimension_name = name.into();
        self
    }

    /// Set the sampling of the series dimension.
    pub fn sampling(&mut self, sampling: Sampling) -> &mut Self {
        self.sampling = Some(sampling);
        self
    }

    /// Set the element order.
    pub fn order(&mut self, order: SeriesOrder) -> &mut Self {
        self.order = order;
        self
    }

    /// Materialise every element when the series is built.
    pub fn eager(&mut self, eager: bool) -> &mut Self {
        self.eager = eager;
        self
    }

    /// Set the window applied to every element stack.
    pub fn window(&mut self, window: Option<Window>) -> &mut Self {
        self.window = window;
        self
    }

    /// Set the handle policy of element stacks.
    pub fn handle_policy(&mut self, handle_policy: HandlePolicy) -> &mut Self {
        self.handle_policy = handle_policy;
        self
    }

    /// Build a series from the files in directory `dir` with an extension of the format.
    ///
    /// Subdirectories are not searched.
    /// Files are listed in file name order.
    ///
    /// # Errors
    /// Returns a [`SeriesError`] if the directory cannot be listed, or any error of [`build_from_paths`](Self::build_from_paths).
    pub fn build_from_dir(&self, dir: impl AsRef<Path>) -> Result<SeriesScan, SeriesError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && self.format.matches_extension(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        self.build_from_paths(paths)
    }

    /// Build a series from `paths`.
    ///
    /// Paths without a parseable coordinate are skipped and returned in [`SeriesScan::skipped`].
    ///
    /// # Errors
    /// Returns a [`SeriesError`] if
    /// - no path has a parseable coordinate ([`SeriesError::EmptySeries`]),
    /// - the parsed coordinates mix date-times and numbers,
    /// - the sampling does not suit the coordinates, or
    /// - the series is eager and an element cannot be materialised.
    pub fn build_from_paths<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<SeriesScan, SeriesError> {
        let mut parsed: Vec<(PathBuf, CoordinateValue)> = Vec::new();
        let mut skipped = Vec::new();
        for path in paths {
            let path = path.as_ref();
            match self.format.parse_path_coordinate(path) {
                Ok(coordinate) => parsed.push((path.to_path_buf(), coordinate)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping series file");
                    skipped.push(err);
                }
            }
        }
        if parsed.is_empty() {
            return Err(SeriesError::EmptySeries {
                skipped: skipped.len(),
            });
        }
        let incompatible = || DimensionError::IncompatibleCoordinates(self.dimension_name.clone());
        let times = parsed.iter().filter(|(_, coordinate)| coordinate.is_time()).count();
        if times != 0 && times != parsed.len() {
            return Err(incompatible().into());
        }
        if self.order == SeriesOrder::Coordinate {
            parsed.sort_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        }

        let (paths, coordinates): (Vec<_>, Vec<_>) = parsed.into_iter().unzip();
        let coordinates = Coordinates::from_values(&coordinates).ok_or_else(incompatible)?;
        let dim = match &self.sampling {
            Some(sampling) => {
                Dimension::new_with_sampling(&self.dimension_name, coordinates, sampling.clone())?
            }
            None => Dimension::new(&self.dimension_name, coordinates),
        };

        let loader = Arc::new(StackLoader {
            format: self.format.clone(),
            window: self.window.clone(),
            handle_policy: self.handle_policy,
        });
        let series = Series {
            dim,
            elements: paths
                .into_iter()
                .map(|path| SeriesElement::Lazy {
                    path,
                    loader: loader.clone(),
                    stack: Mutex::new(None),
                })
                .collect(),
        };
        if self.eager {
            series.materialize()?;
        }
        tracing::debug!(
            format = self.format.name(),
            len = series.len(),
            skipped = skipped.len(),
            eager = self.eager,
            "constructed series"
        );
        Ok(SeriesScan { series, skipped })
    }
}
