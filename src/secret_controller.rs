mod main;
pub use main::*;
mod reconcile;
pub use reconcile::{CloudsSink, SECRET_MANAGER_NAME, SyncOutcome, sync_secret};
