// src/modem/mod.rs

// Declare the sub-modules holding the impl blocks
mod aggregator;
mod io_helpers;
mod session;
mod transaction;

#[cfg(test)]
mod mock;

pub use aggregator::{Completion, PayloadReport};

use crate::common::{
    config::LinkConfig,
    hal_traits::{SerialChannel, Timer},
};

/// Drives an ESP-AT radio module over a serial line, one transaction at a time.
///
/// The modem owns the serial interface but not the receive buffers; every
/// transaction takes the buffer it fills, clears it first, and leaves the
/// received bytes in it for inspection.
#[derive(Debug)]
pub struct AtModem<IF>
where
    IF: SerialChannel + Timer,
{
    interface: IF,
    config: LinkConfig,
}

impl<IF> AtModem<IF>
where
    IF: SerialChannel + Timer,
{
    pub fn new(interface: IF) -> Self {
        Self::with_config(interface, LinkConfig::default())
    }

    pub fn with_config(interface: IF, config: LinkConfig) -> Self {
        AtModem { interface, config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Replaces the timeouts, e.g. with [`LinkConfig::patient`] before a retry.
    pub fn set_config(&mut self, config: LinkConfig) {
        self.config = config;
    }

    /// Gives the interface back.
    pub fn release(self) -> IF {
        self.interface
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::mock::MockInterface;
    use super::*;
    use crate::common::timing;

    #[test]
    fn test_modem_construction() {
        let modem = AtModem::new(MockInterface::new());
        assert_eq!(modem.config().join_timeout, timing::JOIN_TIMEOUT);
    }

    #[test]
    fn test_set_config_and_release() {
        let mut modem = AtModem::new(MockInterface::new());
        modem.set_config(LinkConfig::patient());
        assert_eq!(modem.config().join_timeout, timing::JOIN_TIMEOUT * 2);
        let iface = modem.release();
        assert!(iface.messages().is_empty());
    }
}
