pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DocketError, Result, StoreError};
pub use types::{AuditFields, EntityId, Timestamp, epoch};
