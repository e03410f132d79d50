pub mod overlay;
pub mod reconciler;
pub mod views;

pub use overlay::{PendingLike, PendingOverlay};
pub use reconciler::{MergeReport, Reconciler};
pub use views::{project, AccountState, Projection, VisibleItem};
