use crate::storage::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, api_token: Option<String>) -> Self {
        Self {
            store,
            api_token: api_token.map(Arc::from),
        }
    }
}
