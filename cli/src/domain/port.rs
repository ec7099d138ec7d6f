//! Port registry domain rules: the allocatable range, retry policy, and
//! parsing of registry listings.

use std::ops::Range;
use std::time::Duration;

/// Ports handed out by the registry: unprivileged, excluding 65535.
pub const PORT_RANGE: Range<u16> = 1024..65535;

/// Bounded retry schedule for drawing port candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of candidates drawn before giving up.
    pub max_attempts: u32,
    /// Delay after the first rejected candidate; doubles on each rejection.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 32,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given (1-based) rejected attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Extract the port from a `grep -l` listing of registry entries.
///
/// Each line is a path `<dir>/<port>`; the first line naming a port inside
/// [`PORT_RANGE`] wins. Lines outside `dir` or with non-numeric names are
/// ignored.
#[must_use]
pub fn parse_registry_listing(dir: &str, listing: &str) -> Option<u16> {
    listing.lines().find_map(|line| {
        let name = line.trim().strip_prefix(dir)?.strip_prefix('/')?;
        let port: u16 = name.parse().ok()?;
        PORT_RANGE.contains(&port).then_some(port)
    })
}
