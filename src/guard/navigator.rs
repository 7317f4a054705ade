use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

/// Something that can send the user to another page.
///
/// Navigation is requested, not awaited: the caller keeps running after
/// `navigate` returns.
pub trait Navigator {
    fn navigate(&self, path: &str);
}

impl<N: Navigator + ?Sized> Navigator for &N {
    fn navigate(&self, path: &str) {
        (**self).navigate(path)
    }
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn navigate(&self, path: &str) {
        (**self).navigate(path)
    }
}

/// Records every requested path instead of going anywhere.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    visited: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visited.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Navigation requested");
        self.visited.lock().push(path.to_string());
    }
}
