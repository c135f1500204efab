//! Device status snapshot

use edgecnn_chip::regs::status;

/// One read of STATUS and the performance counters.
///
/// Always read fresh from hardware, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    /// Inference in progress
    pub busy: bool,
    /// Last inference finished
    pub done: bool,
    /// 4-bit error code, 0 when healthy
    pub error_code: u8,
    /// Cumulative cycle count
    pub cycles: u32,
    /// Cumulative operation count
    pub operations: u32,
}

impl DeviceStatus {
    /// Decode a raw STATUS value plus the two counters.
    pub const fn from_raw(raw: u32, cycles: u32, operations: u32) -> Self {
        Self {
            busy: raw & status::BUSY != 0,
            done: raw & status::DONE != 0,
            error_code: status::error_code(raw),
            cycles,
            operations,
        }
    }

    /// Whether the device reports an error.
    pub const fn has_error(&self) -> bool {
        self.error_code != 0
    }

    /// Operations per cycle, if any cycles have elapsed.
    #[allow(clippy::cast_precision_loss)]
    pub fn ops_per_cycle(&self) -> Option<f64> {
        (self.cycles != 0).then(|| f64::from(self.operations) / f64::from(self.cycles))
    }
}
