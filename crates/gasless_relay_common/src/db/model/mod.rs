mod order_dao;

pub use order_dao::{OrderDbObj, OrderStatus, OrderStep};
