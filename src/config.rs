//! Global configuration options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{series::SeriesOrder, stack::HandlePolicy};

/// Global configuration options for the rasterstack crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// # Stack Configuration Options
///
/// ## Default Handle Policy
/// > default: [`HandlePolicy::OpenPerRead`]
///
/// The [`HandlePolicy`] of stacks opened from a single multi-layer file, unless set with [`StackBuilder::handle_policy`](crate::stack::StackBuilder::handle_policy).
///
/// # Series Configuration Options
///
/// ## Series Concurrent Limit
/// > default: [`std::thread::available_parallelism`]`()`
///
/// The maximum number of stacks materialised concurrently when a series is built eagerly.
///
/// ## Series Order
/// > default: [`SeriesOrder::Coordinate`]
///
/// The order of the elements of a series built from a directory or a list of paths, unless set with [`SeriesBuilder::order`](crate::series::SeriesBuilder::order).
#[derive(Debug)]
pub struct Config {
    default_handle_policy: HandlePolicy,
    series_concurrent_limit: usize,
    series_order: SeriesOrder,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_handle_policy: HandlePolicy::default(),
            series_concurrent_limit: std::thread::available_parallelism()
                .map_or(1, std::num::NonZeroUsize::get),
            series_order: SeriesOrder::default(),
        }
    }
}

impl Config {
    /// Get the [default handle policy](#default-handle-policy) configuration.
    #[must_use]
    pub fn default_handle_policy(&self) -> HandlePolicy {
        self.default_handle_policy
    }

    /// Set the [default handle policy](#default-handle-policy) configuration.
    pub fn set_default_handle_policy(&mut self, handle_policy: HandlePolicy) {
        self.default_handle_policy = handle_policy;
    }

    /// Get the [series concurrent limit](#series-concurrent-limit) configuration.
    #[must_use]
    pub fn series_concurrent_limit(&self) -> usize {
        self.series_concurrent_limit
    }

    /// Set the [series concurrent limit](#series-concurrent-limit) configuration.
    pub fn set_series_concurrent_limit(&mut self, concurrent_limit: usize) {
        self.series_concurrent_limit = concurrent_limit;
    }

    /// Get the [series order](#series-order) configuration.
    #[must_use]
    pub fn series_order(&self) -> SeriesOrder {
        self.series_order
    }

    /// Set the [series order](#series-order) configuration.
    pub fn set_series_order(&mut self, series_order: SeriesOrder) {
        self.series_order = series_order;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global rasterstack configuration.
///
/// This might deadlock if the global config is already mutably held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global rasterstack configuration.
///
/// This might deadlock if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}
