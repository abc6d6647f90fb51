/// Snapshot handed to progress callbacks after every tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickProgress {
    /// Ticks executed so far.
    pub step: usize,
    pub steps: usize,
    /// Time of the tick just executed.
    pub sim_time_s: f64,
    pub t_end_s: f64,
    pub fraction_complete: f64,
    /// Warning markers recorded so far.
    pub warnings: usize,
}
