//! Environmental signals — observable values that decide when a new theme
//! should be proposed, and the monitor that watches them for change.

use std::collections::HashMap;

use chrono::{Local, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// A single observation of a signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalValue {
    /// Opaque per-signal payload (e.g. `{"hour": 20, "period": "evening"}`).
    pub raw: serde_json::Value,
    /// The observation mapped into `[0, 1]`.
    pub normalized: f64,
    /// Human-readable description of the observation.
    pub label: String,
}

/// An observable environmental signal.
///
/// Each signal kind owns its own change predicate, so the monitor never
/// grows a per-kind dispatch table. The default predicate is the generic
/// rule for signal kinds without a better notion of "changed".
pub trait Signal: Send + Sync {
    /// Stable identifier, used as the snapshot key (e.g. `time-of-day`).
    fn id(&self) -> &str;

    /// Short human description of what this signal observes.
    fn describe(&self) -> &str;

    /// Observe the environment now.
    fn value(&self) -> SignalValue;

    /// Whether the move from `prev` to `curr` should trigger a new theme.
    fn is_significant_change(&self, prev: &SignalValue, curr: &SignalValue) -> bool {
        (prev.normalized - curr.normalized).abs() > 0.1
    }
}

// ─── Time of day ───────────────────────────────────────────

/// Buckets the 24-hour clock into five fixed periods.
pub struct TimeOfDaySignal;

impl TimeOfDaySignal {
    pub const ID: &'static str = "time-of-day";

    /// Period name for an hour of the day.
    pub fn period(hour: u32) -> &'static str {
        match hour {
            6..=11 => "morning",
            12..=14 => "midday",
            15..=17 => "afternoon",
            18..=20 => "evening",
            _ => "night",
        }
    }

    /// Build the observation for a specific clock reading.
    pub fn value_at(hour: u32, minute: u32) -> SignalValue {
        let period = Self::period(hour);
        let (clock_hour, meridiem) = match hour % 12 {
            0 => (12, if hour < 12 { "am" } else { "pm" }),
            h => (h, if hour < 12 { "am" } else { "pm" }),
        };
        let mut label = period.to_string();
        if let Some(first) = label.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        SignalValue {
            raw: json!({ "hour": hour, "period": period }),
            normalized: f64::from(hour) / 24.0,
            label: format!("{} ({}:{:02} {})", label, clock_hour, minute, meridiem),
        }
    }
}

impl Signal for TimeOfDaySignal {
    fn id(&self) -> &str {
        Self::ID
    }

    fn describe(&self) -> &str {
        "Current time of day, bucketed into morning/midday/afternoon/evening/night"
    }

    fn value(&self) -> SignalValue {
        let now = Local::now();
        Self::value_at(now.hour(), now.minute())
    }

    /// Significant iff the period bucket changed, not the raw hour — a new
    /// theme every few minutes within the same period would be noise.
    fn is_significant_change(&self, prev: &SignalValue, curr: &SignalValue) -> bool {
        match (prev.raw.get("period"), curr.raw.get("period")) {
            (Some(a), Some(b)) => a != b,
            _ => (prev.normalized - curr.normalized).abs() > 0.1,
        }
    }
}

// ─── Monitor ───────────────────────────────────────────────

/// Result of one monitor check: the fresh snapshot of every signal, and
/// whether any of them changed significantly since the previous check.
#[derive(Debug, Clone)]
pub struct SignalCheck {
    pub values: HashMap<String, SignalValue>,
    pub changed: bool,
}

/// Polls registered signals and detects significant change.
///
/// Retains exactly one previous `SignalValue` per signal id; every check
/// overwrites it. The very first check for a signal is always significant
/// so an initial theme can be proposed immediately. Scheduling lives with
/// the caller — the monitor only answers "did anything change?".
#[derive(Default)]
pub struct SignalMonitor {
    signals: Vec<Box<dyn Signal>>,
    previous: HashMap<String, SignalValue>,
}

impl SignalMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor with the built-in signal set registered.
    pub fn with_defaults() -> Self {
        let mut monitor = Self::new();
        monitor.register(Box::new(TimeOfDaySignal));
        monitor
    }

    pub fn register(&mut self, signal: Box<dyn Signal>) {
        self.signals.push(signal);
    }

    /// Ids and descriptions of all registered signals.
    pub fn describe_signals(&self) -> Vec<(String, String)> {
        self.signals
            .iter()
            .map(|s| (s.id().to_string(), s.describe().to_string()))
            .collect()
    }

    /// The snapshot from the most recent check.
    pub fn current(&self) -> &HashMap<String, SignalValue> {
        &self.previous
    }

    /// Refresh every signal, compare against the previous snapshot, and
    /// report whether any signal changed significantly (OR across signals).
    pub fn check(&mut self) -> SignalCheck {
        let mut values = HashMap::new();
        let mut changed = false;

        for signal in &self.signals {
            let curr = signal.value();
            let significant = match self.previous.get(signal.id()) {
                Some(prev) => signal.is_significant_change(prev, &curr),
                // No history yet: always significant.
                None => true,
            };
            if significant {
                debug!(signal = signal.id(), label = %curr.label, "significant signal change");
                changed = true;
            }
            values.insert(signal.id().to_string(), curr);
        }

        self.previous = values.clone();
        SignalCheck { values, changed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(TimeOfDaySignal::period(5), "night");
        assert_eq!(TimeOfDaySignal::period(6), "morning");
        assert_eq!(TimeOfDaySignal::period(11), "morning");
        assert_eq!(TimeOfDaySignal::period(12), "midday");
        assert_eq!(TimeOfDaySignal::period(17), "afternoon");
        assert_eq!(TimeOfDaySignal::period(20), "evening");
        assert_eq!(TimeOfDaySignal::period(21), "night");
    }

    #[test]
    fn time_of_day_labels() {
        assert_eq!(TimeOfDaySignal::value_at(20, 0).label, "Evening (8:00 pm)");
        assert_eq!(TimeOfDaySignal::value_at(0, 15).label, "Night (12:15 am)");
        assert_eq!(TimeOfDaySignal::value_at(11, 30).label, "Morning (11:30 am)");
        assert_eq!(TimeOfDaySignal::value_at(12, 5).label, "Midday (12:05 pm)");
    }

    #[test]
    fn time_of_day_normalization() {
        let v = TimeOfDaySignal::value_at(12, 0);
        assert!((v.normalized - 0.5).abs() < 1e-9);
    }

    #[test]
    fn bucket_change_is_significant_same_bucket_is_not() {
        let signal = TimeOfDaySignal;
        let eleven = TimeOfDaySignal::value_at(11, 0);
        let eleven_thirty = TimeOfDaySignal::value_at(11, 30);
        let thirteen = TimeOfDaySignal::value_at(13, 0);

        assert!(signal.is_significant_change(&eleven, &thirteen));
        assert!(!signal.is_significant_change(&eleven, &eleven_thirty));
    }

    /// A signal that replays a scripted list of observations.
    struct ScriptedSignal {
        values: Mutex<Vec<SignalValue>>,
    }

    impl ScriptedSignal {
        fn new(values: Vec<SignalValue>) -> Self {
            let mut values = values;
            values.reverse();
            Self {
                values: Mutex::new(values),
            }
        }

        fn at(normalized: f64) -> SignalValue {
            SignalValue {
                raw: serde_json::Value::Null,
                normalized,
                label: format!("{normalized}"),
            }
        }
    }

    impl Signal for ScriptedSignal {
        fn id(&self) -> &str {
            "scripted"
        }

        fn describe(&self) -> &str {
            "replays scripted values"
        }

        fn value(&self) -> SignalValue {
            self.values.lock().unwrap().pop().expect("script exhausted")
        }
    }

    #[test]
    fn first_check_is_always_significant() {
        let mut monitor = SignalMonitor::new();
        monitor.register(Box::new(ScriptedSignal::new(vec![ScriptedSignal::at(0.5)])));
        assert!(monitor.check().changed);
    }

    #[test]
    fn generic_rule_needs_a_large_enough_delta() {
        let mut monitor = SignalMonitor::new();
        monitor.register(Box::new(ScriptedSignal::new(vec![
            ScriptedSignal::at(0.50),
            ScriptedSignal::at(0.55),
            ScriptedSignal::at(0.80),
        ])));

        assert!(monitor.check().changed); // first check
        assert!(!monitor.check().changed); // 0.05 delta
        assert!(monitor.check().changed); // 0.25 delta
    }

    #[test]
    fn snapshot_is_overwritten_each_check() {
        let mut monitor = SignalMonitor::new();
        monitor.register(Box::new(ScriptedSignal::new(vec![
            ScriptedSignal::at(0.1),
            ScriptedSignal::at(0.9),
        ])));

        monitor.check();
        monitor.check();
        let snapshot = monitor.current().get("scripted").unwrap();
        assert!((snapshot.normalized - 0.9).abs() < 1e-9);
    }
}
