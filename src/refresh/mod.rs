//! Client-side refresh core: keeps a view's state consistent with the REST
//! API without user-triggered reloads.
//!
//! ## Module Map
//!
//! ```text
//!  mount / timer / manual
//!          │
//!          v
//!  scheduler.rs  (MountedView: owns the timer task and the ViewStore)
//!          │ FetchCoordinator::begin()   → seq = n, is_refreshing
//!          │ FetchCoordinator::complete() (spawned, holds Weak<ViewStore>)
//!          v
//!  coordinator.rs  (join_all over FetchPlan, per-request timeout)
//!          │ RemoteSource::fetch()
//!          v
//!  source.rs  (RequestSpec, FetchPlan, RemoteSource, HttpSource)
//!          │
//!          │ Snapshot or CycleFailure
//!          v
//!  view_state.rs  (ViewStore: commit only if seq is the newest started)
//! ```
//!
//! | Module        | Responsibility                                           |
//! |---------------|----------------------------------------------------------|
//! | `cycle`       | `Trigger`, `Snapshot`, `FetchCycle`, `CycleOutcome`      |
//! | `views`       | `ViewKind` presets: which endpoints each view batches    |
//!
//! Every trigger starts a new cycle immediately, even if one is in flight.
//! Races are resolved at commit time: a cycle whose sequence number is no
//! longer the newest started for its view is discarded without touching the
//! view. Dropping a `MountedView` stops the timer; in-flight cycles finish in
//! the background and their results go nowhere.

pub mod coordinator;
pub mod cycle;
pub mod scheduler;
pub mod source;
pub mod view_state;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;

pub use coordinator::{DEFAULT_REQUEST_TIMEOUT, FetchCoordinator};
pub use cycle::{CycleOutcome, FetchCycle, Snapshot, Trigger};
pub use scheduler::{DEFAULT_REFRESH_INTERVAL, MountedView, SchedulerState};
pub use source::{FetchPlan, HttpSource, RemoteSource, RequestSpec};
pub use view_state::{ViewState, ViewStatus, ViewStore};
pub use views::{DEFAULT_TREND_DAYS, ViewKind};
