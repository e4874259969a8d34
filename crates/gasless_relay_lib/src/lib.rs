pub mod config;
pub mod contracts;
pub mod eth;
pub mod queue;
pub mod relay;
pub mod rpc;
pub mod runtime;
pub mod server;
pub mod setup;
pub mod signer;
pub mod transaction;

pub use gasless_relay_common::db;
pub use gasless_relay_common::error;
pub use gasless_relay_common::{err_create, err_custom_create, err_from};
