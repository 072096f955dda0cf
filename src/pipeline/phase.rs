//! Pipeline phases
//!
//! A phase is a named ordering anchor. Phases carry no ordering value of
//! their own; their position is decided by the pipeline they are added to.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Named ordering anchor in a [`Pipeline`](super::Pipeline).
///
/// Cloning is cheap and clones compare equal. Two phases created separately
/// are distinct even when they share a name.
#[derive(Clone)]
pub struct PipelinePhase {
    name: Arc<str>,
}

impl PipelinePhase {
    /// Create a new phase
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// Phase name, for diagnostics only
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for PipelinePhase {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }
}

impl Eq for PipelinePhase {}

impl Hash for PipelinePhase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.name) as *const u8 as usize).hash(state);
    }
}

impl fmt::Debug for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelinePhase({})", self.name)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Where a phase sits relative to the phases already registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePhaseRelation {
    /// Immediately before the referenced phase
    Before(PipelinePhase),
    /// After the referenced phase and any phases already placed after it
    After(PipelinePhase),
    /// At the end of the pipeline
    Last,
}
