//! Dwell planning: where the cadence ticks fall while stopped at a vertex.

/// Tolerance for comparing times (s).
pub(crate) const TIME_EPSILON: f64 = 1e-9;

/// Outcome of a dwell at one vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct DwellPlan {
    /// Elapsed times of the cadence ticks falling inside the dwell.
    pub ticks: Vec<f64>,
    /// Elapsed time when the entity moves again.
    pub end: f64,
    /// Tick budget left when the entity moves again.
    pub budget: f64,
}

impl DwellPlan {
    /// True if the dwell ended no later than the next cadence tick.
    pub fn absorbed(&self) -> bool {
        self.ticks.is_empty()
    }
}

/// Plan a dwell of `pause` seconds starting at `start` with `budget` seconds
/// left before the next cadence tick.
///
/// A dwell no longer than the budget is absorbed; one that uses the budget
/// exactly leaves zero budget, so the dwell end is itself the tick. Otherwise the first tick
/// closes the budget, one more tick falls on every full `rate` inside the
/// dwell, and the returned budget resumes the cadence after it.
pub fn plan_dwell(start: f64, pause: f64, budget: f64, rate: f64) -> DwellPlan {
    if pause <= 0.0 {
        return DwellPlan {
            ticks: Vec::new(),
            end: start,
            budget,
        };
    }

    let end = start + pause;

    if pause <= budget + TIME_EPSILON {
        return DwellPlan {
            ticks: Vec::new(),
            end,
            budget: (budget - pause).max(0.0),
        };
    }

    let mut tick = start + budget;
    let mut ticks = vec![tick];
    let mut remaining = pause - budget;

    while remaining >= rate - TIME_EPSILON {
        tick += rate;
        ticks.push(tick);
        remaining -= rate;
    }

    DwellPlan {
        ticks,
        end,
        budget: rate - remaining.max(0.0),
    }
}
