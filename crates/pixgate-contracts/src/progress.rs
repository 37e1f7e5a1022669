pub const PROGRESS_START: f64 = 5.0;
pub const PROGRESS_CEILING: f64 = 92.0;
pub const PROGRESS_DONE: f64 = 100.0;
pub const PROGRESS_MAX_STEP: f64 = 8.0;
pub const PROGRESS_TICK_MS: u64 = 450;

/// Cosmetic progress shown while a request is in flight.
///
/// Ticks never carry the value past [`PROGRESS_CEILING`]; only
/// [`ProgressMeter::complete`] reaches 100.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressMeter {
    value: f64,
}

impl ProgressMeter {
    pub fn started() -> Self {
        Self {
            value: PROGRESS_START,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn percent(&self) -> u8 {
        self.value.round().clamp(0.0, PROGRESS_DONE) as u8
    }

    /// Adds `step` (clamped to `[0, PROGRESS_MAX_STEP)`), holding at the ceiling.
    pub fn tick(&mut self, step: f64) -> f64 {
        if self.value >= PROGRESS_CEILING {
            self.value = PROGRESS_CEILING;
            return self.value;
        }
        let step = if step.is_finite() {
            step.clamp(0.0, PROGRESS_MAX_STEP)
        } else {
            0.0
        };
        self.value = (self.value + step).min(PROGRESS_CEILING);
        self.value
    }

    pub fn complete(&mut self) {
        self.value = PROGRESS_DONE;
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_hold_at_ceiling_until_complete() {
        let mut meter = ProgressMeter::started();
        assert_eq!(meter.percent(), 5);
        for _ in 0..100 {
            meter.tick(7.9);
            assert!(meter.value() <= PROGRESS_CEILING);
        }
        assert_eq!(meter.value(), PROGRESS_CEILING);
        meter.complete();
        assert_eq!(meter.percent(), 100);
        meter.reset();
        assert_eq!(meter.percent(), 0);
    }

    #[test]
    fn oversized_or_bogus_steps_are_clamped() {
        let mut meter = ProgressMeter::started();
        meter.tick(50.0);
        assert_eq!(meter.value(), PROGRESS_START + PROGRESS_MAX_STEP);
        meter.tick(-3.0);
        assert_eq!(meter.value(), PROGRESS_START + PROGRESS_MAX_STEP);
        meter.tick(f64::NAN);
        assert_eq!(meter.value(), PROGRESS_START + PROGRESS_MAX_STEP);
    }
}
