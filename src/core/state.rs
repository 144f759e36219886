use std::sync::Arc;

use crate::core::config::Settings;
use crate::db::Store;
use crate::services::ai_grading::Grader;
use crate::services::content_generation::ContentGenerator;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Store,
    grader: Arc<dyn Grader>,
    generator: Arc<dyn ContentGenerator>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Store,
        grader: Arc<dyn Grader>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, store, grader, generator }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &Store {
        &self.inner.store
    }

    pub(crate) fn grader(&self) -> &dyn Grader {
        self.inner.grader.as_ref()
    }

    pub(crate) fn generator(&self) -> &dyn ContentGenerator {
        self.inner.generator.as_ref()
    }
}
