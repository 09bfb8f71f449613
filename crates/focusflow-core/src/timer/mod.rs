mod clock;
mod completion;
mod driver;
mod engine;
mod mode;
mod progress;

pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{
    completion_message, DeferredStart, AUTO_START_DELAY_MS, VIBRATION_PATTERN,
};
pub use driver::{SpawnedEffects, TimerDriver, TimerHandle, TokioClock};
pub use engine::{format_clock, TimerEngine, TimerState};
pub use mode::{Mode, Transition};
pub use progress::{progress_fraction, ProgressAnchor, ProgressClock};
