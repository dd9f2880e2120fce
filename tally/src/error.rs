use thiserror::Error;

/// Why an increment was not merged.
///
/// Never surfaced to callers of `increment`; used for counting and logging.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("entity id is nil")]
    NilEntity,

    #[error("amount is not finite")]
    NonFiniteAmount,

    #[error("unknown counter kind id: {0}")]
    UnknownKind(u16),

    #[error("engine is not accepting increments")]
    NotRunning,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not a valid number: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
