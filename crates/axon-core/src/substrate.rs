//! Substrate Interfaces
//!
//! The two seams between the core and its host: a sensor the boot sequence
//! reads its energy budget from, and a byte sink manifold side effects are
//! written to. Missing or failing readings degrade to a conservative
//! default rather than failing the boot.

use serde::{Deserialize, Serialize};

// ============================================================================
// SUBSTRATE READING
// ============================================================================

/// One observation of the hosting machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateReading {
    /// Total RAM in MB
    pub total_ram_mb: u64,
    /// Available RAM in MB
    pub available_ram_mb: u64,
    /// Estimated used RAM in bytes
    pub used_ram_bytes_estimate: u64,
    /// CPU cycle frequency in Hz
    pub cpu_cycle_hz: u64,
    /// CPU uptime in ticks
    pub cpu_uptime_ticks: u64,
    /// RTC hours
    pub rtc_hours: u8,
    /// RTC minutes
    pub rtc_minutes: u8,
    /// RTC seconds
    pub rtc_seconds: u8,
}

impl Default for SubstrateReading {
    /// The conservative fallback: 128 MB, fully available, everything else
    /// zeroed.
    fn default() -> Self {
        Self {
            total_ram_mb: 128,
            available_ram_mb: 128,
            used_ram_bytes_estimate: 0,
            cpu_cycle_hz: 0,
            cpu_uptime_ticks: 0,
            rtc_hours: 0,
            rtc_minutes: 0,
            rtc_seconds: 0,
        }
    }
}

// ============================================================================
// SENSOR
// ============================================================================

/// Source of substrate readings; implemented by the host.
pub trait SubstrateSensor {
    /// Take one reading. Implementations that cannot sense anything should
    /// return [`SubstrateReading::default`].
    fn read(&self) -> SubstrateReading;
}

/// Sensor that always reports the conservative default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSubstrate;

impl SubstrateSensor for DefaultSubstrate {
    fn read(&self) -> SubstrateReading {
        SubstrateReading::default()
    }
}

/// Sensor wrapping a fixed reading (hosts with out-of-band sensing, tests).
#[derive(Debug, Clone)]
pub struct FixedSubstrate(pub SubstrateReading);

impl SubstrateSensor for FixedSubstrate {
    fn read(&self) -> SubstrateReading {
        self.0.clone()
    }
}

// ============================================================================
// BYTE SINK
// ============================================================================

/// Single write-line primitive for manifold-produced side effects. The
/// core never names the underlying transport.
pub trait ByteSink {
    /// Emit one line.
    fn write_line(&mut self, line: &str);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ByteSink for NullSink {
    fn write_line(&mut self, _line: &str) {}
}

/// Sink that buffers lines in memory (tests, diagnostics).
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Collected lines, oldest first
    pub lines: Vec<String>,
}

impl ByteSink for MemorySink {
    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

// ============================================================================
// TESTS
// ============================================================================
