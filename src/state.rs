use std::sync::Arc;

use crate::{auth::AdminAccount, booking::FetchFailurePolicy, store::RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub admin: AdminAccount,
    pub fetch_failure: FetchFailurePolicy,
}
