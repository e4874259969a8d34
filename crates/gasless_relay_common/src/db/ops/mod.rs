mod order_ops;

pub use order_ops::*;
