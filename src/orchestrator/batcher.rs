//! 批次划分
//!
//! 纯函数：无副作用、无 I/O

use crate::models::{Batch, CorpusItem};
use std::num::NonZeroUsize;

/// 批次总数 `ceil(n / batch_size)`
pub fn batch_count(n: usize, batch_size: NonZeroUsize) -> usize {
    n.div_ceil(batch_size.get())
}

/// 把有序条目按固定大小划分为批次，序号从 1 开始，最后一批可能较小
///
/// 按序号拼接所有批次的条目恰好得到输入序列。
pub fn partition(items: Vec<CorpusItem>, batch_size: NonZeroUsize) -> Vec<Batch> {
    let size = batch_size.get();
    let mut batches = Vec::with_capacity(batch_count(items.len(), batch_size));
    let mut remaining = items.into_iter().peekable();

    while remaining.peek().is_some() {
        batches.push(Batch {
            ordinal: batches.len() + 1,
            items: remaining.by_ref().take(size).collect(),
        });
    }

    batches
}
