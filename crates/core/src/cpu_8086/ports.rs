//! Port-mapped I/O space of the 8086.
//!
//! Peripherals implement [`PortDevice`] and are attached to any set of the
//! 65536 ports. Unmapped writes are dropped and unmapped reads return zero;
//! both are logged under [`LogCategory::Ports`].

use crate::error::ConfigError;
use crate::logging::{log, LogCategory, LogLevel};

/// Number of addressable I/O ports
pub const PORT_COUNT: usize = 0x1_0000;

/// A peripheral reachable through IN/OUT
pub trait PortDevice {
    /// Name used in log output and conflict errors
    fn name(&self) -> &str;

    fn pout(&mut self, word: bool, port: u16, value: u16);

    fn pin(&mut self, word: bool, port: u16) -> u16;
}

/// Handle returned by [`PortBus::attach`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId(usize);

/// The 64K port space and the devices attached to it
pub struct PortBus {
    map: Vec<Option<usize>>,
    devices: Vec<Box<dyn PortDevice>>,
}

impl PortBus {
    pub fn new() -> Self {
        Self {
            map: vec![None; PORT_COUNT],
            devices: Vec::new(),
        }
    }

    /// Attach a device to every port in `ports`
    ///
    /// Fails without attaching anything if one of the ports is already taken.
    pub fn attach<I>(&mut self, ports: I, device: Box<dyn PortDevice>) -> Result<DeviceId, ConfigError>
    where
        I: IntoIterator<Item = u16>,
    {
        let ports: Vec<u16> = ports.into_iter().collect();
        for &port in &ports {
            if let Some(existing) = self.map[port as usize] {
                return Err(ConfigError::PortConflict {
                    port,
                    existing: self.devices[existing].name().to_string(),
                });
            }
        }

        let id = self.devices.len();
        log(LogCategory::Ports, LogLevel::Debug, || {
            format!("Ports: attached {} to {} port(s)", device.name(), ports.len())
        });
        self.devices.push(device);
        for port in ports {
            self.map[port as usize] = Some(id);
        }
        Ok(DeviceId(id))
    }

    pub fn is_mapped(&self, port: u16) -> bool {
        self.map[port as usize].is_some()
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut (dyn PortDevice + 'static)> {
        self.devices.get_mut(id.0).map(|d| d.as_mut())
    }

    pub fn pout(&mut self, word: bool, port: u16, value: u16) {
        match self.map[port as usize] {
            Some(id) => self.devices[id].pout(word, port, value),
            None => log(LogCategory::Ports, LogLevel::Debug, || {
                format!("Ports: write to unmapped port {:04X} = {:04X}", port, value)
            }),
        }
    }

    pub fn pin(&mut self, word: bool, port: u16) -> u16 {
        match self.map[port as usize] {
            Some(id) => {
                let value = self.devices[id].pin(word, port);
                if word {
                    value
                } else {
                    value & 0xFF
                }
            }
            None => {
                log(LogCategory::Ports, LogLevel::Debug, || {
                    format!("Ports: read from unmapped port {:04X}", port)
                });
                0
            }
        }
    }
}

impl Default for PortBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PortBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.devices.iter().map(|d| d.name()).collect();
        f.debug_struct("PortBus").field("devices", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Latch device recording every write
    struct Latch {
        writes: Rc<RefCell<Vec<(bool, u16, u16)>>>,
        value: u16,
    }

    impl PortDevice for Latch {
        fn name(&self) -> &str {
            "latch"
        }

        fn pout(&mut self, word: bool, port: u16, value: u16) {
            self.writes.borrow_mut().push((word, port, value));
            self.value = value;
        }

        fn pin(&mut self, _word: bool, port: u16) -> u16 {
            self.value ^ port
        }
    }

    #[test]
    fn test_one_device_many_ports() {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let mut bus = PortBus::new();
        bus.attach(
            0x40..=0x43,
            Box::new(Latch {
                writes: writes.clone(),
                value: 0,
            }),
        )
        .expect("attach");

        bus.pout(false, 0x40, 0x12);
        bus.pout(true, 0x43, 0xBEEF);
        assert_eq!(
            *writes.borrow(),
            vec![(false, 0x40, 0x12), (true, 0x43, 0xBEEF)]
        );
        assert_eq!(bus.pin(true, 0x41), 0xBEEF ^ 0x41);
        // Byte reads are truncated
        assert_eq!(bus.pin(false, 0x41), (0xBEEF ^ 0x41) & 0xFF);
    }

    #[test]
    fn test_unmapped_ports() {
        let mut bus = PortBus::new();
        bus.pout(true, 0x3F8, 0x1234);
        assert_eq!(bus.pin(true, 0x3F8), 0);
        assert!(!bus.is_mapped(0x3F8));
    }

    #[test]
    fn test_conflicting_attach_is_rejected() {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let mut bus = PortBus::new();
        bus.attach(
            [0x20, 0x21],
            Box::new(Latch {
                writes: writes.clone(),
                value: 0,
            }),
        )
        .expect("attach");
        let err = bus
            .attach(
                [0x22, 0x21],
                Box::new(Latch {
                    writes,
                    value: 0,
                }),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::PortConflict { port: 0x21, .. }));
        // Nothing from the failed attach leaked in
        assert!(!bus.is_mapped(0x22));
    }
}
