//! Multi-turn scenarios: a timeline walked one request at a time.
//!
//! State machine per request:
//! - idle: a matching trigger in the current step activates the scenario;
//! - active: the gap counter grows on every request and closes the scenario
//!   once it exceeds `max_gap`; the current step's items are tried in order,
//!   a matching trigger resets the gap and advances, a nested timeline is
//!   tried through a fresh idle evaluation and never advances the outer one;
//! - an unmatched request while active keeps the scenario open.

use serde::Serialize;
use tracing::debug;
use vox_core::Event;

use crate::timeline::{Step, StepItem, Timeline};

/// When a scenario whose final step just fired returns to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Close on the same request that fired the final step.
    #[default]
    Immediate,
    /// Stay active for one more request, which closes the scenario and is
    /// reported as not consumed.
    NextRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScenarioStatus {
    Idle,
    Active { step: usize },
}

#[derive(Debug, Clone, Default)]
struct Progress {
    active: bool,
    requests_since_last_trigger: usize,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    timeline: Timeline,
    max_gap: usize,
    completion: Completion,
    progress: Progress,
}

impl Scenario {
    pub const DEFAULT_MAX_GAP: usize = 3;

    pub fn new(name: impl Into<String>, timeline: Timeline) -> Self {
        Self {
            name: name.into(),
            timeline,
            max_gap: Self::DEFAULT_MAX_GAP,
            completion: Completion::default(),
            progress: Progress::default(),
        }
    }

    pub fn with_max_gap(mut self, max_gap: usize) -> Self {
        self.max_gap = max_gap;
        self
    }

    pub fn with_completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn max_gap(&self) -> usize {
        self.max_gap
    }

    pub fn is_active(&self) -> bool {
        self.progress.active
    }

    pub fn requests_since_last_trigger(&self) -> usize {
        self.progress.requests_since_last_trigger
    }

    pub fn status(&self) -> ScenarioStatus {
        if self.progress.active {
            ScenarioStatus::Active { step: self.timeline.current_step_index() }
        } else {
            ScenarioStatus::Idle
        }
    }

    /// Feed one request. Returns true if the scenario consumed it.
    pub fn check(&mut self, request: &str, history: &[Event]) -> bool {
        let consumed = evaluate(&mut self.timeline, &mut self.progress, self.max_gap, request);

        if consumed && self.completion == Completion::Immediate && self.timeline.is_complete() {
            debug!(scenario = %self.name, "Scenario completed");
            self.reset();
        }

        debug!(
            scenario = %self.name,
            consumed,
            status = ?self.status(),
            gap = self.progress.requests_since_last_trigger,
            history = history.len(),
            "Scenario checked"
        );
        consumed
    }

    /// Return to idle with the cursor on the first step.
    pub fn reset(&mut self) {
        close(&mut self.timeline, &mut self.progress);
    }
}

fn close(timeline: &mut Timeline, progress: &mut Progress) {
    *progress = Progress::default();
    timeline.reset();
}

/// Fire the first matching direct trigger of the current step, if any.
fn fire_current(timeline: &Timeline, request: &str) -> bool {
    let Some(step) = timeline.current_step() else {
        return false;
    };
    match step.triggers().find(|t| t.matches(request)) {
        Some(trigger) => {
            trigger.fire(request);
            true
        }
        None => false,
    }
}

fn evaluate(timeline: &mut Timeline, progress: &mut Progress, max_gap: usize, request: &str) -> bool {
    if !progress.active {
        if !fire_current(timeline, request) {
            return false;
        }
        progress.active = true;
        progress.requests_since_last_trigger = 0;
        timeline.advance();
        return true;
    }

    if timeline.is_complete() {
        close(timeline, progress);
        return false;
    }

    progress.requests_since_last_trigger += 1;
    if progress.requests_since_last_trigger > max_gap {
        close(timeline, progress);
        return false;
    }

    let fired = match timeline.current_step_mut() {
        Some(step) => try_items(step, max_gap, request),
        None => false,
    };
    if fired {
        progress.requests_since_last_trigger = 0;
        timeline.advance();
    }
    true
}

/// Try the step's items in order. Returns true when a direct trigger fired;
/// a nested timeline that takes the request stops the search without
/// firing, keeping the outer cursor in place.
fn try_items(step: &mut Step, max_gap: usize, request: &str) -> bool {
    for item in step.items_mut() {
        match item {
            StepItem::Trigger(trigger) if trigger.matches(request) => {
                trigger.fire(request);
                return true;
            }
            StepItem::Trigger(_) => {}
            StepItem::Nested(nested) => {
                let mut transient = Progress::default();
                if evaluate(nested, &mut transient, max_gap, request) {
                    debug!("Nested timeline consumed request");
                    return false;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::Trigger;
    use std::sync::{Arc, Mutex};

    fn trigger(words: &[&str]) -> Trigger {
        Trigger::new(words.iter().copied()).unwrap()
    }

    fn weather_scenario(max_gap: usize) -> Scenario {
        let timeline = Timeline::new([
            Trigger::builder(["weather"])
                .synonyms("weather", ["clouds", "nature"])
                .build()
                .unwrap(),
            trigger(&["yes"]),
        ]);
        Scenario::new("weather", timeline).with_max_gap(max_gap)
    }

    #[test]
    fn test_idle_ignores_unrelated_request() {
        let mut scenario = weather_scenario(3);
        assert!(!scenario.check("play music", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Idle);
    }

    #[test]
    fn test_activation_and_completion() {
        let mut scenario = weather_scenario(3);
        assert!(scenario.check("how is the weather", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Active { step: 1 });
        assert!(scenario.check("yes please", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Idle);
        assert_eq!(scenario.timeline().current_step_index(), 0);
    }

    #[test]
    fn test_unmatched_request_keeps_scenario_open() {
        let mut scenario = weather_scenario(3);
        scenario.check("weather", &[]);
        assert!(scenario.check("hmm let me think", &[]));
        assert!(scenario.is_active());
        assert_eq!(scenario.requests_since_last_trigger(), 1);
    }

    #[test]
    fn test_gap_closure() {
        let mut scenario = weather_scenario(1);
        assert!(scenario.check("weather", &[]));
        assert!(scenario.check("something else", &[]));
        assert!(!scenario.check("still something else", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Idle);
        assert_eq!(scenario.timeline().current_step_index(), 0);
    }

    #[test]
    fn test_zero_gap_closes_on_first_miss() {
        let mut scenario = weather_scenario(0);
        scenario.check("weather", &[]);
        assert!(!scenario.check("no idea", &[]));
        assert!(!scenario.is_active());
    }

    #[test]
    fn test_reactivation_after_reset() {
        let mut scenario = weather_scenario(1);
        scenario.check("weather", &[]);
        scenario.check("a", &[]);
        scenario.check("b", &[]);
        assert!(!scenario.is_active());

        assert!(scenario.check("the clouds today", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Active { step: 1 });
        assert!(scenario.check("yes", &[]));
    }

    #[test]
    fn test_match_resets_gap() {
        let timeline = Timeline::new([trigger(&["start"]), trigger(&["middle"]), trigger(&["end"])]);
        let mut scenario = Scenario::new("three", timeline).with_max_gap(2);
        scenario.check("start", &[]);
        scenario.check("filler", &[]);
        assert!(scenario.check("middle", &[]));
        assert_eq!(scenario.requests_since_last_trigger(), 0);
        assert!(scenario.check("filler", &[]));
        assert!(scenario.check("end", &[]));
        assert!(!scenario.is_active());
    }

    #[test]
    fn test_next_request_completion() {
        let mut scenario = weather_scenario(3).with_completion(Completion::NextRequest);
        scenario.check("weather", &[]);
        assert!(scenario.check("yes", &[]));
        assert!(scenario.is_active());
        assert!(scenario.timeline().is_complete());

        // The closing tick is not consumed, and does not reactivate.
        assert!(!scenario.check("weather again", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Idle);
        assert!(scenario.check("weather again", &[]));
    }

    #[test]
    fn test_callbacks_fire_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = log.clone();
        let second = log.clone();
        let timeline = Timeline::new([
            Trigger::builder(["weather"])
                .callback(move |r| {
                    first.lock().unwrap().push(format!("ask:{}", r));
                    Ok(())
                })
                .build()
                .unwrap(),
            Trigger::builder(["yes"])
                .callback(move |r| {
                    second.lock().unwrap().push(format!("fetch:{}", r));
                    Ok(())
                })
                .build()
                .unwrap(),
        ]);
        let mut scenario = Scenario::new("weather", timeline);
        scenario.check("weather", &[]);
        scenario.check("yes", &[]);
        assert_eq!(*log.lock().unwrap(), vec!["ask:weather", "fetch:yes"]);
    }

    #[test]
    fn test_failing_callback_still_advances() {
        let timeline = Timeline::new([
            Trigger::builder(["weather"])
                .callback(|_| anyhow::bail!("tts unavailable"))
                .build()
                .unwrap(),
            trigger(&["yes"]),
        ]);
        let mut scenario = Scenario::new("weather", timeline);
        assert!(scenario.check("weather", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Active { step: 1 });
    }

    #[test]
    fn test_nested_timeline_consumes_without_advancing() {
        let nested = Timeline::new([trigger(&["tell"]), trigger(&["more"])]);
        let timeline = Timeline::new([Step::from(trigger(&["story"])), Step::from(nested)]);
        let mut scenario = Scenario::new("story", timeline).with_max_gap(5);

        assert!(scenario.check("story time", &[]));
        assert!(scenario.check("tell me", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Active { step: 1 });
        match scenario.timeline().current_step().map(Step::items) {
            Some([StepItem::Nested(inner)]) => assert_eq!(inner.current_step_index(), 1),
            other => panic!("expected nested step, got {:?}", other),
        }
        assert!(scenario.check("more", &[]));
    }

    #[test]
    fn test_mixed_step_trigger_or_nested() {
        let mixed = || {
            Step::new([
                StepItem::from(Timeline::new([trigger(&["tell"]), trigger(&["more"])])),
                StepItem::from(trigger(&["done"])),
            ])
        };
        let timeline = Timeline::new([Step::from(trigger(&["story"])), mixed(), Step::from(trigger(&["bye"]))]);
        let mut scenario = Scenario::new("story", timeline).with_max_gap(5);

        assert!(scenario.check("story", &[]));
        // The nested branch takes the request; the outer cursor stays put.
        assert!(scenario.check("tell me", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Active { step: 1 });
        assert_eq!(scenario.requests_since_last_trigger(), 1);
        // The direct trigger in the same step advances.
        assert!(scenario.check("i am done", &[]));
        assert_eq!(scenario.status(), ScenarioStatus::Active { step: 2 });
        assert_eq!(scenario.requests_since_last_trigger(), 0);
        assert!(scenario.check("bye", &[]));
        assert!(!scenario.is_active());
    }

    #[test]
    fn test_idle_scenario_ignores_nested_openers() {
        let timeline = Timeline::new([
            Step::new([
                StepItem::from(Timeline::new([trigger(&["tell"])])),
                StepItem::from(trigger(&["story"])),
            ]),
            Step::from(trigger(&["end"])),
        ]);
        let mut scenario = Scenario::new("story", timeline);
        assert!(!scenario.check("tell", &[]));
        assert!(scenario.check("story", &[]));
    }

    #[test]
    fn test_check_is_deterministic_for_fresh_state() {
        let mut a = weather_scenario(2);
        let mut b = weather_scenario(2);
        let requests = ["weather", "uh", "yes", "nature", "x", "y", "z"];
        let history = vec![Event::request("earlier")];
        let ra: Vec<bool> = requests.iter().map(|r| a.check(r, &history)).collect();
        let rb: Vec<bool> = requests.iter().map(|r| b.check(r, &history)).collect();
        assert_eq!(ra, rb);
        assert_eq!(ra, vec![true, true, true, true, true, true, false]);
    }
}
