use super::documents::{GOODS_RECEIPT_MODULE, GoodsReceipt, WORK_ORDER_MODULE, WorkOrder};
use crate::core::{Clock, Result};
use crate::repository::Repository;
use crate::sequence::{SequenceService, SequenceStore};
use crate::storage::StoreTransaction;
use std::sync::Arc;
use tracing::info;

/// Creates numbered documents.
///
/// The number reservation and the document insert share the caller's
/// transaction: both become visible at commit, or neither does.
#[derive(Clone)]
pub struct DocumentService {
    sequences: SequenceService,
    goods_receipts: Repository<GoodsReceipt>,
    work_orders: Repository<WorkOrder>,
}

impl DocumentService {
    pub fn new(sequences: SequenceService, clock: Arc<dyn Clock>) -> Self {
        Self {
            sequences,
            goods_receipts: Repository::new(Arc::clone(&clock)),
            work_orders: Repository::new(clock),
        }
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let sequences = SequenceService::new(SequenceStore::new(Arc::clone(&clock)));
        Self::new(sequences, clock)
    }

    pub fn sequences(&self) -> &SequenceService {
        &self.sequences
    }

    pub fn goods_receipts(&self) -> &Repository<GoodsReceipt> {
        &self.goods_receipts
    }

    pub fn work_orders(&self) -> &Repository<WorkOrder> {
        &self.work_orders
    }

    pub async fn create_goods_receipt<T: StoreTransaction>(
        &self,
        tx: &mut T,
        mut draft: GoodsReceipt,
        actor: &str,
    ) -> Result<GoodsReceipt> {
        draft.number = self
            .sequences
            .next_number_by_module(tx, GOODS_RECEIPT_MODULE)
            .await?;
        let receipt = self.goods_receipts.insert(tx, draft, actor).await?;
        info!(id = receipt.id, number = %receipt.number, actor, "goods receipt created");
        Ok(receipt)
    }

    pub async fn create_work_order<T: StoreTransaction>(
        &self,
        tx: &mut T,
        mut draft: WorkOrder,
        actor: &str,
    ) -> Result<WorkOrder> {
        draft.number = self
            .sequences
            .next_number_by_module(tx, WORK_ORDER_MODULE)
            .await?;
        let order = self.work_orders.insert(tx, draft, actor).await?;
        info!(id = order.id, number = %order.number, actor, "work order created");
        Ok(order)
    }
}
