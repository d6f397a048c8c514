use serde::Serialize;

use crate::value_id::ValueId;

/// Value lifecycle events, queued on the owning node and drained by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value_id")]
pub enum Notification {
    ValueAdded(ValueId),
    ValueRemoved(ValueId),
    /// A report committed a new value.
    ValueChanged(ValueId),
    /// A report confirmed the value already held.
    ValueRefreshed(ValueId),
}

impl Notification {
    #[must_use]
    pub const fn value_id(&self) -> ValueId {
        match self {
            Self::ValueAdded(id)
            | Self::ValueRemoved(id)
            | Self::ValueChanged(id)
            | Self::ValueRefreshed(id) => *id,
        }
    }
}
