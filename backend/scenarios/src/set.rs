//! Name-keyed collection of scenarios.
//!
//! Every scenario sees every request; several may be active at once.
use tracing::{debug, info};
use vox_core::Event;

use crate::scenario::Scenario;

#[derive(Debug, Clone, Default)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scenario, replacing one with the same name in place.
    pub fn add_scenario(&mut self, scenario: Scenario) {
        if let Some(existing) = self.scenarios.iter_mut().find(|s| s.name() == scenario.name()) {
            debug!(scenario = %scenario.name(), "Replacing scenario");
            *existing = scenario;
            return;
        }
        info!(scenario = %scenario.name(), "Registered scenario");
        self.scenarios.push(scenario);
    }

    pub fn remove_scenario(&mut self, name: &str) -> Option<Scenario> {
        let position = self.scenarios.iter().position(|s| s.name() == name)?;
        Some(self.scenarios.remove(position))
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name() == name)
    }

    pub fn all(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Names of the scenarios currently active.
    pub fn active(&self) -> Vec<&str> {
        self.scenarios
            .iter()
            .filter(|s| s.is_active())
            .map(Scenario::name)
            .collect()
    }

    /// Feed `request` to every scenario and return those that consumed it.
    pub fn check_all(&mut self, request: &str, history: &[Event]) -> Vec<&Scenario> {
        let consumed: Vec<usize> = self
            .scenarios
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.check(request, history).then_some(i))
            .collect();
        consumed.into_iter().map(|i| &self.scenarios[i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Timeline;
    use crate::trigger::Trigger;

    fn scenario(name: &str, opener: &str, follow_up: &str) -> Scenario {
        Scenario::new(
            name,
            Timeline::new([
                Trigger::new([opener]).unwrap(),
                Trigger::new([follow_up]).unwrap(),
            ]),
        )
    }

    fn names(consumed: Vec<&Scenario>) -> Vec<String> {
        consumed.iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn test_add_replaces_by_name_in_place() {
        let mut set = ScenarioSet::new();
        set.add_scenario(scenario("weather", "weather", "yes"));
        set.add_scenario(scenario("tasks", "task", "yes"));
        set.add_scenario(scenario("weather", "forecast", "sure"));

        assert_eq!(set.len(), 2);
        assert_eq!(set.all()[0].name(), "weather");
        assert!(names(set.check_all("weather", &[])).is_empty());
        assert_eq!(names(set.check_all("forecast", &[])), vec!["weather"]);
    }

    #[test]
    fn test_remove_scenario() {
        let mut set = ScenarioSet::new();
        set.add_scenario(scenario("weather", "weather", "yes"));
        assert!(set.remove_scenario("weather").is_some());
        assert!(set.remove_scenario("weather").is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_independent_evaluation() {
        let mut set = ScenarioSet::new();
        set.add_scenario(scenario("weather", "weather", "yes"));
        set.add_scenario(scenario("tasks", "task", "yes"));

        assert_eq!(names(set.check_all("weather", &[])), vec!["weather"]);
        assert_eq!(names(set.check_all("next task", &[])), vec!["weather", "tasks"]);
        assert_eq!(set.active(), vec!["weather", "tasks"]);

        // Both active scenarios take the follow-up.
        assert_eq!(names(set.check_all("yes", &[])), vec!["weather", "tasks"]);
        assert!(set.active().is_empty());
    }

    #[test]
    fn test_get() {
        let mut set = ScenarioSet::new();
        set.add_scenario(scenario("weather", "weather", "yes"));
        set.check_all("weather", &[Event::request("hello")]);
        assert!(set.get("weather").unwrap().is_active());
        assert!(set.get("missing").is_none());
    }
}
