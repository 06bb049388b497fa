pub mod order;
pub mod period;

pub use order::{LineItem, Order, OrderState, SquareOrder};
pub use period::Period;
