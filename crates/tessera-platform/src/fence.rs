// SPDX-License-Identifier: CEPL-1.0
use crate::SyncId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceStatus {
    /// GPU work before the fence has completed.
    ConditionSatisfied,
    /// The timeout elapsed first. Not a failure.
    TimeoutExpired,
    Error,
}

/// GPU/CPU sync point. The null fence is what platforms without sync
/// support hand out; waiting on it reports [`FenceStatus::Error`].
#[derive(Debug)]
pub struct Fence {
    sync: SyncId,
}

impl Fence {
    pub const fn null() -> Self {
        Self { sync: SyncId::NULL }
    }

    pub fn new(sync: SyncId) -> Self {
        Self { sync }
    }

    pub fn sync(&self) -> SyncId {
        self.sync
    }

    pub fn is_null(&self) -> bool {
        self.sync.is_null()
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::null()
    }
}
