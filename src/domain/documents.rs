use crate::core::{AuditFields, EntityId, Timestamp};
use chrono::NaiveDate;
use docket_derive::ChangeTracked;
use serde::{Deserialize, Serialize};

pub const GOODS_RECEIPT_MODULE: &str = "GR";
pub const WORK_ORDER_MODULE: &str = "WO";

/// Goods received against a supplier delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ChangeTracked)]
#[tracked(table = "goods_receipts")]
pub struct GoodsReceipt {
    #[tracked(id)]
    pub id: EntityId,
    /// Issued from the `GR` series at creation; immutable afterwards.
    #[tracked(skip)]
    pub number: String,
    pub supplier: String,
    pub warehouse: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub received_on: Option<NaiveDate>,
    pub remarks: Option<String>,
    #[tracked(audit)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ChangeTracked)]
#[tracked(table = "work_orders")]
pub struct WorkOrder {
    #[tracked(id)]
    pub id: EntityId,
    #[tracked(skip)]
    pub number: String,
    pub title: String,
    pub assignee: String,
    pub priority: i32,
    pub status: String,
    pub due_at: Timestamp,
    #[tracked(audit)]
    pub audit: AuditFields,
}
