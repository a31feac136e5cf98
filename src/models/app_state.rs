use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::mover::MoveService;
use crate::storage::StateStore;

/// Application state shared between connections
pub struct AppState {
    pub storage: Mutex<StateStore>,
    pub mover: Arc<dyn MoveService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, mover: Arc<dyn MoveService>) -> Self {
        AppState {
            storage: Mutex::new(StateStore::open(&config.state_file)),
            mover,
            config,
        }
    }
}
