mod bag;
mod custom;
mod wrapped;

pub use bag::{ErrorBag, RpcPhase};
pub use custom::CustomError;
pub use wrapped::RelayError;

/// Export macros for creating errors
mod macros;
