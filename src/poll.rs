use embedded_hal::delay::DelayNs;

/// A bounded number of attempts separated by a fixed delay.
///
/// The flash has no clock of its own to time out against, so waiting is
/// expressed as "sample at most `attempts` times, sleeping `interval_us`
/// after every unsuccessful sample". The worst case wait is therefore roughly
/// `attempts * interval_us` plus the time the samples themselves take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PollBudget {
    attempts: u32,
    interval_us: u32,
}

impl PollBudget {
    pub const fn new(attempts: u32, interval_us: u32) -> Self {
        Self {
            attempts,
            interval_us,
        }
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn interval_us(&self) -> u32 {
        self.interval_us
    }

    /// Calls `ready` until it returns `true` or the budget runs out.
    ///
    /// Returns the number of samples taken on success and `None` once every
    /// attempt reported not ready. A budget of zero attempts never samples.
    /// Errors from `ready` abort the poll immediately.
    pub fn poll<D, E, F>(&self, delay: &mut D, mut ready: F) -> Result<Option<u32>, E>
    where
        D: DelayNs,
        F: FnMut() -> Result<bool, E>,
    {
        for attempt in 1..=self.attempts {
            if ready()? {
                return Ok(Some(attempt));
            }
            delay.delay_us(self.interval_us);
        }
        Ok(None)
    }
}
