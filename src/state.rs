use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::enrollment::BatchEnrollmentPipeline;
use crate::store::StudentStore;
use crate::validation::QuestionValidator;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StudentStore>,
    pub validator: Arc<QuestionValidator>,
    pub enrollment: Arc<BatchEnrollmentPipeline>,
    pub config: Config,
}

impl AppState {
    /// Wires the built-in rule set and an enrollment pipeline over `store`.
    pub fn new(store: Arc<dyn StudentStore>, config: Config) -> Self {
        let enrollment = BatchEnrollmentPipeline::new(Arc::clone(&store))
            .with_concurrency(config.enrollment_concurrency);

        Self {
            store,
            validator: Arc::new(QuestionValidator::default()),
            enrollment: Arc::new(enrollment),
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn StudentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<QuestionValidator> {
    fn from_ref(state: &AppState) -> Self {
        state.validator.clone()
    }
}

impl FromRef<AppState> for Arc<BatchEnrollmentPipeline> {
    fn from_ref(state: &AppState) -> Self {
        state.enrollment.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
