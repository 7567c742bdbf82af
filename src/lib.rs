//! A rust library for named stacks of dimensioned raster layers.
//!
//! A [`Stack`](stack::Stack) is a collection of named layers sharing one coordinate system.
//! Each layer is a dimensioned array over a subset of the stack [`Dimension`](dimension::Dimension)s.
//! Stacks are backed by in-memory arrays, by one file per layer, or by a single multi-layer file read on demand.
//! A [`Series`](series::Series) is an ordered sequence of stacks along an additional dimension, typically time, built from the files of a directory.
//!
//! ## Getting Started
//! - [`stack`] covers stack construction, windowed reads, slicing and [concatenation](stack::concat).
//! - [`dimension`] covers coordinates, interval sampling and [locus shifting](dimension::Dimension::shift_locus).
//! - [`window`] covers selectors, indexers and windows.
//! - [`source`] covers the file formats stacks are read from, including the reference [`GridStackFormat`](source::GridStackFormat).
//! - [`series`] covers series construction from directories of files.
//!
//! ## Example
//! ```rust
//! # use ndarray::ArrayD;
//! # use rasterstack::dimension::{Dimension, Locus};
//! # use rasterstack::layer::DimArray;
//! # use rasterstack::stack::Stack;
//! # use rasterstack::window::{Indexer, Selector, Window};
//! let x = Dimension::new("x", vec![0.0, 1.0, 2.0, 3.0]);
//! let time = Dimension::regular("time", vec![1i64, 2, 3], 1i64, Locus::Start)?;
//! let elevation = DimArray::new(ArrayD::zeros(vec![4]), vec![x.clone()])?;
//! let rainfall = DimArray::new(ArrayD::ones(vec![4, 3]), vec![x, time])?;
//!
//! let stack = Stack::from_named_layers([("elevation", elevation), ("rainfall", rainfall)])?
//!     .with_window(Some(Window::named([("x", Selector::Range(1..3))])));
//! assert_eq!(stack.dims().len(), 2);
//!
//! let rainfall = stack.read_layer("rainfall", &Indexer::named([("time", Selector::at(2i64))]))?;
//! assert_eq!(rainfall.shape(), &[2]);
//! assert_eq!(rainfall.refdims()[0].name().as_str(), "time");
//!
//! let time = rainfall.refdims()[0].shift_locus(Locus::End)?;
//! assert_eq!(time.coordinates().first(), Some(3i64.into()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Logging
//! `rasterstack` emits [`tracing`] events: `debug` when stacks and series are constructed, `trace` for file opens, closes and reads, and `warn` for files skipped while building a series.
//! No subscriber is installed.
//!
//! ## Licence
//! `rasterstack` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod byte_range;
pub mod config;
pub mod dimension;
pub mod layer;
pub mod metadata;
pub mod series;
pub mod source;
pub mod stack;
pub mod window;
