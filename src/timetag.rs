//! NTP-style 64-bit time representation used as the OSC bundle timestamp.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// NTP 64-bit timestamp: whole seconds since 1900-01-01 UTC, plus a fractional
/// part in units of 2⁻³² seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timetag {
    pub sec: u32,
    pub frac: u32,
}

/// Sentinel meaning "dispatch immediately", rather than at a specific instant.
pub const IMMEDIATE: Timetag = Timetag { sec: 0, frac: 1 };

impl Timetag {
    pub const fn new(sec: u32, frac: u32) -> Self {
        Timetag { sec, frac }
    }

    /// The current wall-clock time, expressed as an NTP timetag.
    pub fn now() -> Self {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_unix(since_unix.as_secs(), since_unix.subsec_micros())
    }

    /// Builds a timetag from Unix seconds and a microsecond fraction.
    pub fn from_unix(unix_seconds: u64, micros: u32) -> Self {
        let sec = unix_seconds.wrapping_add(NTP_UNIX_OFFSET_SECS) as u32;
        let frac = ((micros as f64 / 1_000_000.0) * (1u64 << 32) as f64) as u32;
        Timetag { sec, frac }
    }

    /// Converts back to (unix_seconds, micros), for callers that want a
    /// `SystemTime`-shaped view of the timestamp.
    pub fn to_unix(self) -> (u64, u32) {
        let unix_secs = (self.sec as u64).wrapping_sub(NTP_UNIX_OFFSET_SECS);
        let micros = (self.frac as f64 / (1u64 << 32) as f64 * 1_000_000.0) as u32;
        (unix_secs, micros)
    }

    /// `true` if this is the `IMMEDIATE` sentinel.
    pub fn is_immediate(self) -> bool {
        self == IMMEDIATE
    }

    /// `true` if this timetag is not in the future relative to `now` (i.e. it
    /// should be dispatched right away rather than scheduled).
    pub fn is_due(self, now: Timetag) -> bool {
        self.is_immediate() || self <= now
    }

    /// Difference `self - other`, in fractional seconds.
    pub fn diff_secs(self, other: Timetag) -> f64 {
        let sec_diff = self.sec as i64 - other.sec as i64;
        let frac_diff = self.frac as i64 - other.frac as i64;
        sec_diff as f64 + (frac_diff as f64) / (1u64 << 32) as f64
    }
}

impl std::ops::Sub for Timetag {
    type Output = f64;

    fn sub(self, rhs: Timetag) -> f64 {
        self.diff_secs(rhs)
    }
}

impl Default for Timetag {
    fn default() -> Self {
        IMMEDIATE
    }
}
