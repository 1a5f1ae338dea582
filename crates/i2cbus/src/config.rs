/// Number of bus indices supported when no configuration is given.
pub const DEFAULT_MAX_BUSES: usize = 2;
/// Lowest slave address a handle may be opened for. Addresses below this
/// are reserved by the I2C specification.
pub const MIN_SLAVE_ADDRESS: u16 = 0x08;
/// Highest 7-bit slave address.
pub const MAX_SLAVE_ADDRESS: u16 = 0x7F;

/// Registry and address-validation settings.
///
/// Built with `const` setters so a process-wide configuration can live in a
/// `const` or `static`:
///
/// ```
/// use i2cbus::BusConfig;
///
/// const CONFIG: BusConfig = BusConfig::new().with_max_buses(4);
/// assert_eq!(CONFIG.max_buses, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Size of the lock table. Valid bus indices are `0..max_buses`.
    pub max_buses: usize,
    /// Addresses below this value are rejected at open time.
    pub min_address: u16,
    /// Addresses with any of these bits set are rejected at open time.
    pub excluded_bits: u16,
    /// When set, explicit locking is only available to handles in a
    /// cooperating group.
    pub explicit_lock_requires_context: bool,
}

impl BusConfig {
    pub const fn new() -> Self {
        Self {
            max_buses: DEFAULT_MAX_BUSES,
            min_address: MIN_SLAVE_ADDRESS,
            excluded_bits: 0,
            explicit_lock_requires_context: false,
        }
    }

    pub const fn with_max_buses(mut self, max_buses: usize) -> Self {
        self.max_buses = max_buses;
        self
    }

    pub const fn with_min_address(mut self, min_address: u16) -> Self {
        self.min_address = min_address;
        self
    }

    pub const fn with_excluded_bits(mut self, excluded_bits: u16) -> Self {
        self.excluded_bits = excluded_bits;
        self
    }

    pub const fn with_explicit_lock_requires_context(
        mut self,
        required: bool,
    ) -> Self {
        self.explicit_lock_requires_context = required;
        self
    }

    /// Returns `true` if `index` names a slot in the lock table.
    pub const fn check_index(&self, index: usize) -> bool {
        index < self.max_buses
    }

    /// Returns `true` if `address` is a legal 7-bit slave address under this
    /// configuration.
    pub const fn check_address(&self, address: u16) -> bool {
        address >= self.min_address
            && address <= MAX_SLAVE_ADDRESS
            && address & self.excluded_bits == 0
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_two_buses() {
        let config = BusConfig::default();
        assert!(config.check_index(0));
        assert!(config.check_index(1));
        assert!(!config.check_index(2));
    }

    #[test]
    fn reserved_addresses_rejected() {
        let config = BusConfig::new();
        for address in 0..MIN_SLAVE_ADDRESS {
            assert!(!config.check_address(address), "0x{address:02x}");
        }
        assert!(config.check_address(0x08));
        assert!(config.check_address(0x7F));
        assert!(!config.check_address(0x80));
    }

    #[test]
    fn excluded_bits_mask_addresses() {
        let config = BusConfig::new().with_excluded_bits(0x40);
        assert!(config.check_address(0x3F));
        assert!(!config.check_address(0x48));
    }

    #[test]
    fn min_address_is_configurable() {
        let config = BusConfig::new().with_min_address(0x10);
        assert!(!config.check_address(0x0F));
        assert!(config.check_address(0x10));
    }
}
