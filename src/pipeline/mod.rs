//! Phase-ordered interceptor pipeline
//!
//! A [`Pipeline`] keeps its phases in a list built from registration order and
//! the relations given at insertion time. Interceptors registered at each phase
//! are merged, phase by phase, into one flat execution plan. The plan is cached
//! and only rebuilt after the phase list or an interceptor list changes.

mod content;
mod context;
mod phase;

pub use content::PhaseContent;
pub use context::{ExecutionPlan, Interceptor, PipelineContext};
pub use phase::{PipelinePhase, PipelinePhaseRelation};

use anyhow::{anyhow, Result};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Interceptor pipeline over subject type `S` with caller context `C`
pub struct Pipeline<S, C> {
    phases: Vec<PhaseContent<S, C>>,
    plan: RwLock<Option<ExecutionPlan<S, C>>>,
}

impl<S, C> Default for Pipeline<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> Pipeline<S, C> {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self {
            phases: Vec::new(),
            plan: RwLock::new(None),
        }
    }

    /// Create a pipeline with `phases` registered in order
    pub fn with_phases(phases: impl IntoIterator<Item = PipelinePhase>) -> Self {
        let mut pipeline = Self::new();
        for phase in phases {
            pipeline.add_phase(phase);
        }
        pipeline
    }

    /// Registered phases in resolved order
    pub fn phases(&self) -> Vec<PipelinePhase> {
        self.phases.iter().map(|c| c.phase().clone()).collect()
    }

    /// Whether `phase` is registered
    pub fn has_phase(&self, phase: &PipelinePhase) -> bool {
        self.find_phase_index(phase).is_some()
    }

    /// Append `phase` at the end. Adding a registered phase again is a no-op.
    pub fn add_phase(&mut self, phase: PipelinePhase) {
        if self.has_phase(&phase) {
            return;
        }
        self.phases
            .push(PhaseContent::new(phase, PipelinePhaseRelation::Last));
        self.invalidate();
    }

    /// Register `phase` according to `relation`
    pub fn add_phase_with(
        &mut self,
        phase: PipelinePhase,
        relation: PipelinePhaseRelation,
    ) -> Result<()> {
        match relation {
            PipelinePhaseRelation::Before(reference) => self.insert_phase_before(&reference, phase),
            PipelinePhaseRelation::After(reference) => self.insert_phase_after(&reference, phase),
            PipelinePhaseRelation::Last => {
                self.add_phase(phase);
                Ok(())
            }
        }
    }

    /// Insert `phase` immediately before `reference`
    ///
    /// Several phases inserted before the same reference keep their
    /// registration order.
    pub fn insert_phase_before(
        &mut self,
        reference: &PipelinePhase,
        phase: PipelinePhase,
    ) -> Result<()> {
        if self.has_phase(&phase) {
            return Ok(());
        }
        let index = self
            .find_phase_index(reference)
            .ok_or_else(|| anyhow!("Phase `{}` was not registered for this pipeline", reference))?;

        self.phases.insert(
            index,
            PhaseContent::new(phase, PipelinePhaseRelation::Before(reference.clone())),
        );
        self.invalidate();
        Ok(())
    }

    /// Insert `phase` after `reference` and after any phase already inserted
    /// after it
    pub fn insert_phase_after(
        &mut self,
        reference: &PipelinePhase,
        phase: PipelinePhase,
    ) -> Result<()> {
        if self.has_phase(&phase) {
            return Ok(());
        }
        let index = self
            .find_phase_index(reference)
            .ok_or_else(|| anyhow!("Phase `{}` was not registered for this pipeline", reference))?;

        let mut last_related = index;
        for (offset, content) in self.phases[index + 1..].iter().enumerate() {
            if let PipelinePhaseRelation::After(target) = content.relation() {
                if target == reference {
                    last_related = index + 1 + offset;
                }
            }
        }

        self.phases.insert(
            last_related + 1,
            PhaseContent::new(phase, PipelinePhaseRelation::After(reference.clone())),
        );
        self.invalidate();
        Ok(())
    }

    /// Register `interceptor` at `phase`
    pub fn intercept(
        &mut self,
        phase: &PipelinePhase,
        interceptor: Arc<dyn Interceptor<S, C>>,
    ) -> Result<()> {
        let index = self
            .find_phase_index(phase)
            .ok_or_else(|| anyhow!("Phase `{}` was not registered for this pipeline", phase))?;

        self.phases[index].add_interceptor(interceptor);
        self.invalidate();
        Ok(())
    }

    /// Number of interceptors across all phases
    pub fn interceptor_count(&self) -> usize {
        self.phases.iter().map(PhaseContent::len).sum()
    }

    /// Whether no interceptor is registered
    pub fn is_empty(&self) -> bool {
        self.phases.iter().all(PhaseContent::is_empty)
    }

    /// Describe the execution plan as `(phase, interceptor)` name pairs
    pub fn execution_plan(&self) -> Vec<(String, String)> {
        self.phases
            .iter()
            .flat_map(|content| {
                content
                    .interceptors()
                    .iter()
                    .map(move |i| (content.phase().name().to_string(), i.name().to_string()))
            })
            .collect()
    }

    /// Run the chain over `subject`
    ///
    /// Returns the final subject when every interceptor proceeded, `None` when
    /// one of them stopped the chain.
    pub async fn execute(&self, context: Arc<C>, subject: S) -> Result<Option<S>> {
        let plan = self.merged_plan();
        let mut ctx = PipelineContext::new(context, subject, plan);
        ctx.proceed().await?;

        if ctx.is_completed() {
            Ok(Some(ctx.into_subject()))
        } else {
            Ok(None)
        }
    }

    /// Cached plan, rebuilt when the topology changed since the last call
    fn merged_plan(&self) -> ExecutionPlan<S, C> {
        if let Ok(cached) = self.plan.read() {
            if let Some(plan) = cached.as_ref() {
                return plan.clone();
            }
        }

        let plan = self.merge_phase_interceptors();
        if let Ok(mut cached) = self.plan.write() {
            *cached = Some(plan.clone());
        }
        plan
    }

    fn merge_phase_interceptors(&self) -> ExecutionPlan<S, C> {
        let mut merged = Vec::with_capacity(self.interceptor_count());
        for content in &self.phases {
            content.add_to(&mut merged);
        }
        debug!(
            phases = self.phases.len(),
            interceptors = merged.len(),
            "Rebuilt pipeline execution plan"
        );
        merged.into()
    }

    fn invalidate(&mut self) {
        if let Ok(plan) = self.plan.get_mut() {
            *plan = None;
        }
    }

    fn find_phase_index(&self, phase: &PipelinePhase) -> Option<usize> {
        self.phases.iter().position(|c| c.phase() == phase)
    }

    #[cfg(test)]
    fn has_cached_plan(&self) -> bool {
        self.plan.read().map(|p| p.is_some()).unwrap_or(false)
    }
}
