//! Shared application state.

use crate::services::CleanupSweeper;
use filedrop_core::Config;
use filedrop_storage::ObjectStore;
use std::sync::Arc;

/// State shared by every handler. Cheap to clone behind `Arc`.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ObjectStore>,
    pub sweeper: Arc<CleanupSweeper>,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
