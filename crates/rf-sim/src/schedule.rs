//! Report steps.

use rf_wells::ScheduleEvent;

use crate::config::TimeStepConfig;

/// One externally requested reporting interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStep {
    pub index: usize,
    pub start_time: f64,
    pub duration: f64,
    /// Events falling inside `[start_time, start_time + duration)`, in time
    /// order.
    pub events: Vec<ScheduleEvent>,
    /// Time stepping policy taking effect from this step on.
    pub time_stepping: Option<TimeStepConfig>,
}

impl ReportStep {
    pub fn new(index: usize, start_time: f64, duration: f64) -> Self {
        Self {
            index,
            start_time,
            duration,
            events: Vec::new(),
            time_stepping: None,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn with_time_stepping(mut self, config: TimeStepConfig) -> Self {
        self.time_stepping = Some(config);
        self
    }

    pub fn with_event(mut self, event: ScheduleEvent) -> Self {
        self.events.push(event);
        self.events.sort_by(|a, b| a.time.total_cmp(&b.time));
        self
    }

    /// Lay consecutive report steps of the given durations from `start`,
    /// distributing `events` to the step whose interval contains them.
    /// Events at or after the last step's end are dropped.
    pub fn sequence(start: f64, durations: &[f64], mut events: Vec<ScheduleEvent>) -> Vec<Self> {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        let mut events = events.into_iter().peekable();
        let mut steps = Vec::with_capacity(durations.len());
        let mut t = start;
        for (index, &duration) in durations.iter().enumerate() {
            let mut step = ReportStep::new(index, t, duration);
            let end = step.end_time();
            while let Some(event) = events.next_if(|e| e.time < end) {
                step.events.push(event);
            }
            steps.push(step);
            t = end;
        }
        steps
    }
}
