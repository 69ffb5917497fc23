use crate::trigger::Trigger;

/// One alternative inside a step.
#[derive(Debug, Clone)]
pub enum StepItem {
    Trigger(Trigger),
    Nested(Timeline),
}

impl From<Trigger> for StepItem {
    fn from(trigger: Trigger) -> Self {
        StepItem::Trigger(trigger)
    }
}

impl From<Timeline> for StepItem {
    fn from(timeline: Timeline) -> Self {
        StepItem::Nested(timeline)
    }
}

/// One position in a timeline. Triggers and nested timelines may be mixed;
/// they are tried in order.
#[derive(Debug, Clone, Default)]
pub struct Step {
    items: Vec<StepItem>,
}

impl Step {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepItem>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn items(&self) -> &[StepItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [StepItem] {
        &mut self.items
    }

    /// The step's direct triggers, skipping nested timelines.
    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.items.iter().filter_map(|item| match item {
            StepItem::Trigger(trigger) => Some(trigger),
            StepItem::Nested(_) => None,
        })
    }
}

impl From<Vec<Trigger>> for Step {
    fn from(triggers: Vec<Trigger>) -> Self {
        Step::new(triggers)
    }
}

impl From<Vec<StepItem>> for Step {
    fn from(items: Vec<StepItem>) -> Self {
        Step { items }
    }
}

impl From<Trigger> for Step {
    fn from(trigger: Trigger) -> Self {
        Step::new([trigger])
    }
}

impl From<Timeline> for Step {
    fn from(timeline: Timeline) -> Self {
        Step::new([timeline])
    }
}

/// Ordered steps with a cursor.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    steps: Vec<Step>,
    current: usize,
}

impl Timeline {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Step>,
    {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current_step_index(&self) -> usize {
        self.current
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.steps.len()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current)
    }

    pub(crate) fn current_step_mut(&mut self) -> Option<&mut Step> {
        self.steps.get_mut(self.current)
    }

    pub fn advance(&mut self) {
        if !self.is_complete() {
            self.current += 1;
        }
    }

    /// Rewind this timeline and every nested one.
    pub fn reset(&mut self) {
        self.current = 0;
        for item in self.steps.iter_mut().flat_map(|step| step.items.iter_mut()) {
            if let StepItem::Nested(nested) = item {
                nested.reset();
            }
        }
    }
}
