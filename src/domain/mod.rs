//! Business entities built on the change-tracking and numbering core.

pub mod documents;
pub mod service;
pub mod user;

pub use documents::{GOODS_RECEIPT_MODULE, GoodsReceipt, WORK_ORDER_MODULE, WorkOrder};
pub use service::DocumentService;
pub use user::{Role, User};
