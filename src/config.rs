//! Tuning knobs for the address/cellar layout.

use crate::error::ConfigError;

/// Sizing policy of a [`CoalescedSet`](crate::CoalescedSet).
///
/// - `max_load_factor`: growth starts once `len > capacity * max_load_factor`.
///   Lower values spend space to keep collision chains short.
/// - `cellar_ratio`: the cellar holds `floor(address_size * cellar_ratio)`
///   slots. At a fixed total capacity a larger cellar means fewer home
///   addresses and therefore more collisions, but more room to absorb them
///   without spilling into the address region.
/// - `min_address_size`: floor for the address region, used for new and
///   cleared sets and for every rebuild.
///
/// The builders reject a minimum layout whose slot count does not fit in
/// `usize`. A layout that fits may still be too large to allocate, in which
/// case constructing a set panics. Very small load factors are accepted, but
/// growth then needs address sizes past `usize::MAX` and the `try_*`
/// operations report [`ReserveError::CapacityOverflow`](crate::ReserveError).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    max_load_factor: f64,
    cellar_ratio: f64,
    min_address_size: usize,
}

impl Config {
    pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.91;
    pub const DEFAULT_CELLAR_RATIO: f64 = 0.628;
    pub const DEFAULT_MIN_ADDRESS_SIZE: usize = 21;

    pub const fn new() -> Self {
        Self {
            max_load_factor: Self::DEFAULT_MAX_LOAD_FACTOR,
            cellar_ratio: Self::DEFAULT_CELLAR_RATIO,
            min_address_size: Self::DEFAULT_MIN_ADDRESS_SIZE,
        }
    }

    pub fn with_max_load_factor(mut self, factor: f64) -> Result<Self, ConfigError> {
        // Above 1.0 an insert could find no free slot to claim.
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(ConfigError::MaxLoadFactor(factor));
        }
        self.max_load_factor = factor;
        Ok(self)
    }

    pub fn with_cellar_ratio(mut self, ratio: f64) -> Result<Self, ConfigError> {
        if !(ratio.is_finite() && ratio >= 0.0) {
            return Err(ConfigError::CellarRatio(ratio));
        }
        self.cellar_ratio = ratio;
        self.check_layout()
    }

    pub fn with_min_address_size(mut self, size: usize) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroAddressSize);
        }
        self.min_address_size = size;
        self.check_layout()
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    pub fn cellar_ratio(&self) -> f64 {
        self.cellar_ratio
    }

    pub fn min_address_size(&self) -> usize {
        self.min_address_size
    }

    // address + cellar + terminal must be addressable.
    fn check_layout(self) -> Result<Self, ConfigError> {
        let address = self.min_address_size;
        address
            .checked_add(self.cellar_size_for(address))
            .and_then(|n| n.checked_add(1))
            .map(|_| self)
            .ok_or(ConfigError::LayoutOverflow {
                address,
                ratio: self.cellar_ratio,
            })
    }

    pub(crate) fn cellar_size_for(&self, address_size: usize) -> usize {
        (address_size as f64 * self.cellar_ratio).floor() as usize
    }

    /// Whether `count` keys exceed the load limit of `capacity` slots.
    pub(crate) fn over_limit(&self, count: usize, capacity: usize) -> bool {
        count as f64 > capacity as f64 * self.max_load_factor
    }

    /// Smallest address size that keeps `count` keys within the load factor.
    pub(crate) fn address_size_for(&self, count: usize) -> usize {
        (count as f64 / self.max_load_factor).ceil() as usize
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
