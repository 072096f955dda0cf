//! Interceptor execution
//!
//! Each execution of a pipeline owns one [`PipelineContext`]. The context walks
//! the shared execution plan by index: an interceptor hands control to the rest
//! of the chain with [`PipelineContext::proceed`] and gets it back once every
//! downstream interceptor has returned.

use anyhow::Result;
use std::sync::Arc;

/// Shared, immutable list of interceptors in execution order
pub type ExecutionPlan<S, C> = Arc<[Arc<dyn Interceptor<S, C>>]>;

/// A unit of logic registered at a pipeline phase
///
/// Returning without calling `proceed` or `proceed_with` stops the chain: no
/// later interceptor sees the subject.
#[async_trait::async_trait]
pub trait Interceptor<S, C>: Send + Sync {
    /// Inspect or replace the subject and decide whether to continue
    async fn intercept(&self, ctx: &mut PipelineContext<S, C>) -> Result<()>;

    /// Name used in execution plan descriptions
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Per-execution state: the caller context, the current subject and the cursor
pub struct PipelineContext<S, C> {
    context: Arc<C>,
    subject: S,
    plan: ExecutionPlan<S, C>,
    index: usize,
    completed: bool,
}

impl<S, C> PipelineContext<S, C> {
    pub(crate) fn new(context: Arc<C>, subject: S, plan: ExecutionPlan<S, C>) -> Self {
        Self {
            context,
            subject,
            plan,
            index: 0,
            completed: false,
        }
    }

    /// Caller-supplied context
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Current subject, including any replacement made downstream
    pub fn subject(&self) -> &S {
        &self.subject
    }

    /// Run the rest of the chain with the current subject
    pub async fn proceed(&mut self) -> Result<()> {
        let Some(interceptor) = self.plan.get(self.index).cloned() else {
            self.completed = true;
            return Ok(());
        };
        self.index += 1;
        interceptor.intercept(self).await
    }

    /// Replace the subject, then run the rest of the chain
    pub async fn proceed_with(&mut self, subject: S) -> Result<()> {
        self.subject = subject;
        self.proceed().await
    }

    /// Whether the chain reached its end
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn into_subject(self) -> S {
        self.subject
    }
}
