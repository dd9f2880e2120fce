pub mod identity;
pub mod job;
pub mod kind;

pub use identity::CounterIdentity;
pub use job::Job;
pub use kind::CounterKind;
