//! Weighted round-robin across named queues (§4.1): `scrape`=6, `analysis-retrieval`=4,
//! `link-extraction`=3. Lower-weighted queues never starve — each queue gets a turn every cycle
//! through the weighted sequence, just less often than a heavier one.

/// The three queue names and their configured weights, in a fixed order.
pub const QUEUE_WEIGHTS: &[(&str, u32)] = &[
    ("scrape", 6),
    ("analysis-retrieval", 4),
    ("link-extraction", 3),
];

/// Builds the deterministic draw order for one full weighted round-robin cycle: each queue name
/// appears `weight` times, interleaved so no single queue runs back-to-back more than necessary
/// (a smooth/interleaved schedule, not `[a,a,a,a,a,a,b,b,b,b,c,c,c]`).
///
/// This is the sequence [`WeightedQueueCursor`] walks; a worker asks for the next queue to poll,
/// falls through to the next one if it's empty, and wraps back to the start of the cycle.
pub fn build_schedule() -> Vec<&'static str> {
    let total_weight: u32 = QUEUE_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut schedule = Vec::with_capacity(total_weight as usize);
    let mut credits: Vec<f64> = vec![0.0; QUEUE_WEIGHTS.len()];

    for _ in 0..total_weight {
        let (winner_idx, _) = credits
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();

        schedule.push(QUEUE_WEIGHTS[winner_idx].0);
        for (idx, credit) in credits.iter_mut().enumerate() {
            *credit += QUEUE_WEIGHTS[idx].1 as f64;
        }
        credits[winner_idx] -= total_weight as f64;
    }

    schedule
}

/// Cursor over one weighted round-robin cycle, wrapping at the end.
pub struct WeightedQueueCursor {
    schedule: Vec<&'static str>,
    position: usize,
}

impl WeightedQueueCursor {
    pub fn new() -> Self {
        Self {
            schedule: build_schedule(),
            position: 0,
        }
    }

    /// The queue names in draw order, starting from the current position, wrapping once.
    pub fn next_cycle(&mut self) -> Vec<&'static str> {
        let len = self.schedule.len();
        let mut order = Vec::with_capacity(len);
        for i in 0..len {
            order.push(self.schedule[(self.position + i) % len]);
        }
        self.position = (self.position + 1) % len;
        order
    }
}

impl Default for WeightedQueueCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn schedule_length_matches_total_weight() {
        let schedule = build_schedule();
        assert_eq!(schedule.len(), 13);
    }

    #[test]
    fn schedule_contains_each_queue_exactly_its_weight() {
        let schedule = build_schedule();
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for name in &schedule {
            *counts.entry(name).or_insert(0) += 1;
        }
        assert_eq!(counts["scrape"], 6);
        assert_eq!(counts["analysis-retrieval"], 4);
        assert_eq!(counts["link-extraction"], 3);
    }

    #[test]
    fn schedule_never_runs_the_heaviest_queue_back_to_back_more_than_twice() {
        let schedule = build_schedule();
        let mut max_run = 1;
        let mut current_run = 1;
        for window in schedule.windows(2) {
            if window[0] == window[1] {
                current_run += 1;
                max_run = max_run.max(current_run);
            } else {
                current_run = 1;
            }
        }
        assert!(max_run <= 2, "expected interleaving, got a run of {max_run}");
    }

    #[test]
    fn cursor_rotates_start_position_between_cycles() {
        let mut cursor = WeightedQueueCursor::new();
        let first = cursor.next_cycle();
        let second = cursor.next_cycle();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[1], second[0]);
    }
}
