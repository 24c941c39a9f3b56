use std::fmt;

/// A queued one-shot action.
pub type Action<T> = Box<dyn FnOnce(&mut T)>;

struct Entry<T> {
    fire_at: f64,
    label: &'static str,
    action: Action<T>,
}

/// One-shot actions ordered by fire time, drained cooperatively once per tick.
///
/// Entries sharing a fire time run in the order they were queued.
pub struct Scheduler<T> {
    now_ms: f64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0.0,
            entries: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Scheduler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now_ms", &self.now_ms)
            .field(
                "pending",
                &self.entries.iter().map(|e| (e.label, e.fire_at)).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queues `action` to run `delay_ms` after the scheduler's current time.
    pub fn schedule<F>(&mut self, label: &'static str, delay_ms: f64, action: F) -> f64
    where
        F: FnOnce(&mut T) + 'static,
    {
        let fire_at = self.now_ms + delay_ms.max(0.0);
        let position = self.entries.partition_point(|entry| entry.fire_at <= fire_at);
        self.entries.insert(
            position,
            Entry {
                fire_at,
                label,
                action: Box::new(action),
            },
        );
        fire_at
    }

    /// Fire time of the earliest pending entry.
    pub fn next_fire_at(&self) -> Option<f64> {
        self.entries.first().map(|entry| entry.fire_at)
    }

    /// Removes the earliest entry due at or before `until_ms`, moving the
    /// scheduler clock to its fire time.
    pub fn pop_due(&mut self, until_ms: f64) -> Option<(f64, &'static str, Action<T>)> {
        let first = self.entries.first()?;
        if first.fire_at > until_ms {
            return None;
        }
        let entry = self.entries.remove(0);
        self.now_ms = self.now_ms.max(entry.fire_at);
        Some((entry.fire_at, entry.label, entry.action))
    }

    /// Moves the clock forward without running anything.
    pub fn advance_to(&mut self, time_ms: f64) {
        self.now_ms = self.now_ms.max(time_ms);
    }

    /// Runs every entry due at or before `until_ms` against `context`.
    ///
    /// `before` sees the context, fire time and label of each entry just
    /// before its action runs, so callers can bring their own clocks up to
    /// the fire time first.
    pub fn run_due<F>(&mut self, until_ms: f64, context: &mut T, mut before: F) -> usize
    where
        F: FnMut(&mut T, f64, &'static str),
    {
        let mut ran = 0;
        while let Some((fire_at, label, action)) = self.pop_due(until_ms) {
            before(context, fire_at, label);
            action(context);
            ran += 1;
        }
        self.advance_to(until_ms);
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_run_in_fire_order() {
        let mut scheduler: Scheduler<Vec<&str>> = Scheduler::new();
        scheduler.schedule("late", 300.0, |log| log.push("late"));
        scheduler.schedule("early", 100.0, |log| log.push("early"));
        scheduler.schedule("tie", 100.0, |log| log.push("tie"));

        let mut log = Vec::new();
        assert_eq!(scheduler.run_due(50.0, &mut log, |_, _, _| {}), 0);
        assert_eq!(scheduler.run_due(200.0, &mut log, |_, _, _| {}), 2);
        assert_eq!(log, vec!["early", "tie"]);
        assert_eq!(scheduler.run_due(300.0, &mut log, |_, _, _| {}), 1);
        assert_eq!(log, vec!["early", "tie", "late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn delays_are_relative_to_schedule_time() {
        let mut scheduler: Scheduler<u32> = Scheduler::new();
        let mut count = 0;
        scheduler.run_due(1000.0, &mut count, |_, _, _| {});
        let fire_at = scheduler.schedule("later", 500.0, |count| *count += 1);
        assert_eq!(fire_at, 1500.0);
        assert_eq!(scheduler.next_fire_at(), Some(1500.0));
        scheduler.run_due(1499.0, &mut count, |_, _, _| {});
        assert_eq!(count, 0);
        scheduler.run_due(1500.0, &mut count, |_, _, _| {});
        assert_eq!(count, 1);
    }

    #[test]
    fn hook_runs_before_each_action_at_its_fire_time() {
        let mut scheduler: Scheduler<Vec<String>> = Scheduler::new();
        scheduler.schedule("fade", 250.0, |log| log.push("fade ran".to_string()));
        scheduler.schedule("flash", 100.0, |log| log.push("flash ran".to_string()));

        let mut log = Vec::new();
        let ran = scheduler.run_due(400.0, &mut log, |log, fire_at, label| {
            log.push(format!("{label} due at {fire_at}"));
        });
        assert_eq!(ran, 2);
        assert_eq!(
            log,
            vec!["flash due at 100", "flash ran", "fade due at 250", "fade ran"]
        );
        assert_eq!(scheduler.now(), 400.0);
    }

    #[test]
    fn pop_due_moves_clock_to_fire_time() {
        let mut scheduler: Scheduler<()> = Scheduler::new();
        scheduler.schedule("tick", 40.0, |_| {});
        let (fire_at, label, _) = scheduler.pop_due(100.0).unwrap();
        assert_eq!((fire_at, label), (40.0, "tick"));
        assert_eq!(scheduler.now(), 40.0);
    }
}
