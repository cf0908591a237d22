//! Execution attempts and their lifecycle.
//!
//! ```text
//! Created -> Resolved -> Dispatched -> Succeeded
//!    |          |            |
//!    +----------+------------+------> Failed
//! ```
//!
//! Succeeded and Failed are absorbing. There is no retry edge: a new try is
//! a new attempt.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ExecutionContext;
use super::ids::AttemptId;
use super::outcome::{ExternalResult, Failure, OutcomeKind};
use super::params::ResolvedParams;
use super::spec::TaskSpec;
use crate::error::SpindleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Created,
    Resolved,
    Dispatched,
    Succeeded,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Succeeded | AttemptState::Failed)
    }

    pub fn can_transition_to(self, next: AttemptState) -> bool {
        use AttemptState::*;
        matches!(
            (self, next),
            (Created, Resolved)
                | (Resolved, Dispatched)
                | (Dispatched, Succeeded)
                | (Created | Resolved | Dispatched, Failed)
        )
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: AttemptState,
    pub to: AttemptState,
    pub at: DateTime<Utc>,
}

/// One (TaskSpec, ExecutionContext) pairing and its run-time state.
///
/// The spec and context are shared and never mutated; everything that
/// changes during execution lives here.
#[derive(Debug, Clone)]
pub struct ExecutionAttempt {
    attempt_id: AttemptId,
    spec: Arc<TaskSpec>,
    context: Arc<ExecutionContext>,
    state: AttemptState,
    resolved: Option<ResolvedParams>,
    result: Option<ExternalResult>,
    failure: Option<Failure>,
    created_at: DateTime<Utc>,
    transitions: Vec<Transition>,
}

impl ExecutionAttempt {
    pub fn new(
        attempt_id: AttemptId,
        spec: Arc<TaskSpec>,
        context: Arc<ExecutionContext>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            attempt_id,
            spec,
            context,
            state: AttemptState::Created,
            resolved: None,
            result: None,
            failure: None,
            created_at,
            transitions: Vec::new(),
        }
    }

    pub fn mark_resolved(
        &mut self,
        resolved: ResolvedParams,
        at: DateTime<Utc>,
    ) -> Result<(), SpindleError> {
        self.transition(AttemptState::Resolved, at)?;
        self.resolved = Some(resolved);
        Ok(())
    }

    pub fn mark_dispatched(&mut self, at: DateTime<Utc>) -> Result<(), SpindleError> {
        self.transition(AttemptState::Dispatched, at)
    }

    pub fn succeed(&mut self, result: ExternalResult, at: DateTime<Utc>) -> Result<(), SpindleError> {
        self.transition(AttemptState::Succeeded, at)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, err: &SpindleError, at: DateTime<Utc>) -> Result<(), SpindleError> {
        self.transition(AttemptState::Failed, at)?;
        self.failure = Some(Failure::from(err));
        Ok(())
    }

    fn transition(&mut self, to: AttemptState, at: DateTime<Utc>) -> Result<(), SpindleError> {
        let from = self.state;
        if !from.can_transition_to(to) {
            return Err(SpindleError::InvalidTransition { from, to });
        }
        self.state = to;
        self.transitions.push(Transition { from, to, at });
        Ok(())
    }

    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn shared_spec(&self) -> Arc<TaskSpec> {
        Arc::clone(&self.spec)
    }

    pub fn shared_context(&self) -> Arc<ExecutionContext> {
        Arc::clone(&self.context)
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn resolved(&self) -> Option<&ResolvedParams> {
        self.resolved.as_ref()
    }

    pub fn result(&self) -> Option<&ExternalResult> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// `None` until the attempt reaches a terminal state.
    pub fn outcome_kind(&self) -> Option<OutcomeKind> {
        match self.state {
            AttemptState::Succeeded => Some(OutcomeKind::Succeeded),
            AttemptState::Failed => Some(OutcomeKind::Failed),
            _ => None,
        }
    }

    /// When the attempt reached its terminal state.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.transitions
            .last()
            .filter(|t| t.to.is_terminal())
            .map(|t| t.at)
    }
}
