//! Domain - ドメインモデル（ID、kind、spec、コンテキスト、attempt、結果）

pub mod attempt;
pub mod context;
pub mod ids;
pub mod kind;
pub mod outcome;
pub mod params;
pub mod spec;

pub use attempt::{AttemptState, ExecutionAttempt, Transition};
pub use context::ExecutionContext;
pub use ids::{AttemptId, RunId};
pub use kind::{OperationKind, UnknownOperationKind};
pub use outcome::{ExternalResult, Failure, OutcomeKind};
pub use params::{ParamDef, ParamDefault, ParamType, Params, ResolvedParams};
pub use spec::{DEFAULT_CONN_ID, Diagnostic, SessionOptions, TaskSpec};
