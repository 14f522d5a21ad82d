//! Shared application state.
//!
//! Built once at startup and passed by reference into each request
//! handler; there are no ambient globals.

use std::sync::Arc;

use linkmirror_client::{Resolver, TargetTemplate};
use linkmirror_core::{AppConfig, CacheService};

/// Everything a request handler needs.
pub struct AppState {
    pub config: AppConfig,
    pub template: TargetTemplate,
    pub cache: Arc<dyn CacheService>,
    pub resolver: Arc<dyn Resolver>,
}
