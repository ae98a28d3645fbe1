//! Service layer: the trial engine's moving parts.

pub mod aggregator;
pub mod screening_run;
pub mod timing;
pub mod trial_session;

pub use aggregator::{ResultsAggregator, SlotWriter};
pub use screening_run::ScreeningRun;
pub use timing::{SettleTimer, TimingHarness, TrialEpoch};
pub use trial_session::{SubmitOutcome, TrialSession};
