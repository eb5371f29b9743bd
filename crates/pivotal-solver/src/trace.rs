//! Step-by-step progress reporting.
//!
//! Every algorithm reports its progress to a [`StepSink`]: one [`Step`] per
//! pivot for the simplex methods, one per cut round for the cutting-plane
//! method and one per search node for branch-and-bound. Steps arrive in the
//! order the algorithm executes them.

/// Boolean mask shaped like the tableau, `true` on highlighted cells.
pub type HighlightMask = Vec<Vec<bool>>;

/// A single recorded step
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step {
    /// Short description, e.g. `"pivot 3"` or `"node 1.2"`
    pub label: String,
    /// Text rendering of the state after the step
    pub snapshot: String,
    /// Cells to highlight in the snapshot's tableau, if any
    pub highlight: Option<HighlightMask>,
}

impl Step {
    pub fn new(label: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            snapshot: snapshot.into(),
            highlight: None,
        }
    }

    pub fn with_highlight(mut self, mask: HighlightMask) -> Self {
        self.highlight = Some(mask);
        self
    }
}

/// Receiver of algorithm steps.
pub trait StepSink {
    fn record(&mut self, step: Step);

    /// Sinks returning `false` let algorithms skip rendering snapshots.
    fn enabled(&self) -> bool {
        true
    }
}

/// Sink that drops every step.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSteps;

impl StepSink for NoSteps {
    fn record(&mut self, _step: Step) {}

    fn enabled(&self) -> bool {
        false
    }
}

impl StepSink for Vec<Step> {
    fn record(&mut self, step: Step) {
        self.push(step);
    }
}

impl<F> StepSink for F
where
    F: FnMut(Step),
{
    fn record(&mut self, step: Step) {
        self(step)
    }
}

/// Records a step, rendering it only when the sink wants it.
pub(crate) fn emit<F>(sink: &mut dyn StepSink, build: F)
where
    F: FnOnce() -> Step,
{
    if sink.enabled() {
        sink.record(build());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink_preserves_order() {
        let mut labels = Vec::new();
        {
            let mut sink = |step: Step| labels.push(step.label);
            emit(&mut sink, || Step::new("a", ""));
            emit(&mut sink, || Step::new("b", ""));
        }
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn test_no_steps_skips_rendering() {
        let mut rendered = false;
        emit(&mut NoSteps, || {
            rendered = true;
            Step::new("never", "")
        });
        assert!(!rendered);
    }
}
