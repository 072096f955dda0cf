use super::context::Interceptor;
use super::phase::{PipelinePhase, PipelinePhaseRelation};
use std::fmt;
use std::sync::Arc;

/// Interceptors registered at one phase, in registration order
pub struct PhaseContent<S, C> {
    phase: PipelinePhase,
    relation: PipelinePhaseRelation,
    interceptors: Vec<Arc<dyn Interceptor<S, C>>>,
}

impl<S, C> PhaseContent<S, C> {
    pub fn new(phase: PipelinePhase, relation: PipelinePhaseRelation) -> Self {
        Self {
            phase,
            relation,
            interceptors: Vec::new(),
        }
    }

    pub fn phase(&self) -> &PipelinePhase {
        &self.phase
    }

    pub fn relation(&self) -> &PipelinePhaseRelation {
        &self.relation
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn add_interceptor(&mut self, interceptor: Arc<dyn Interceptor<S, C>>) {
        self.interceptors.push(interceptor);
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor<S, C>>] {
        &self.interceptors
    }

    /// Append this phase's interceptors to `destination`, leaving them in place
    pub fn add_to(&self, destination: &mut Vec<Arc<dyn Interceptor<S, C>>>) {
        destination.extend(self.interceptors.iter().cloned());
    }
}

impl<S, C> fmt::Debug for PhaseContent<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Phase `{}`, {} handlers",
            self.phase.name(),
            self.interceptors.len()
        )
    }
}
