//! Application state module

use std::{fmt, sync::Arc};

use crate::domain::dispatch::DispatchService;

/// Global application state
#[derive(Clone)]
pub struct AppState<D: DispatchService> {
    /// Dispatch service
    pub dispatch: Arc<D>,
}

/// Implementation of the application state
impl<D> AppState<D>
where
    D: DispatchService,
{
    /// Create a new application state
    pub fn new(dispatch: Arc<D>) -> Self {
        Self { dispatch }
    }
}

impl<D> fmt::Debug for AppState<D>
where
    D: DispatchService,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("dispatch", &"DispatchService")
            .finish()
    }
}
