//! Application state for the API server

use crate::{Config, NewsNode};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The news node every handler works through
    pub node: Arc<NewsNode>,

    /// Configuration the router was built with
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(node: Arc<NewsNode>, config: Arc<Config>) -> Self {
        Self { node, config }
    }
}
