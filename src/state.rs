use std::sync::Arc;
use url::Url;

use crate::auth::{TokenKeys, UserStore};
use crate::routes::tasks::queries::TaskStore;

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenKeys>,
    pub page_size: u32,
    pub public_base_url: Option<Url>,
}
