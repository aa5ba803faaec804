use skyforge_client::ReplicateProvider;
use skyforge_core::GenerationService;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub service: GenerationService<ReplicateProvider>,
}

impl AppState {
    pub fn new(service: GenerationService<ReplicateProvider>) -> Self {
        Self { service }
    }
}
