use crate::session::SessionStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Session registry handle (internally `Arc`'d, cheap to clone)
    pub store: SessionStore,
}

impl AppState {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }
}
