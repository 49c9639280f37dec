//! Capital allocation module
//!
//! Position sizing, reservations, and loss-limit checks

mod allocator;
mod types;

pub use allocator::CapitalAllocator;
pub use types::{CapitalStatus, Exposure, LimitCheck, PositionSize};
