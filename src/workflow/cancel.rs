use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::FormError;

/// 取消标记，只在字段边界检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), FormError> {
        if self.is_cancelled() {
            Err(FormError::Cancelled)
        } else {
            Ok(())
        }
    }
}
