use std::collections::VecDeque;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::ZWaveError;
use crate::msg::Msg;

/// Send priority. Lower variants drain first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueuePriority {
    /// User-initiated set commands.
    Command,
    /// Other controller-originated sends.
    Send,
    /// Static discovery and state queries.
    Query,
    /// Periodic polling.
    Poll,
}

impl QueuePriority {
    pub const ALL: [Self; 4] = [Self::Command, Self::Send, Self::Query, Self::Poll];

    const fn slot(self) -> usize {
        match self {
            Self::Command => 0,
            Self::Send => 1,
            Self::Query => 2,
            Self::Poll => 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct QueuedMsg {
    pub priority: QueuePriority,
    pub msg: Msg,
}

/// Destination for outgoing requests. Enqueueing never blocks; delivery,
/// retries and sleeping-node parking belong to the transport.
pub trait SendQueue {
    fn send_msg(&mut self, msg: Msg, priority: QueuePriority) -> Result<(), ZWaveError>;
}

/// In-memory priority queue, FIFO within a priority.
#[derive(Debug, Default)]
pub struct MsgQueue {
    slots: [VecDeque<Msg>; 4],
}

impl MsgQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<QueuedMsg> {
        QueuePriority::ALL.into_iter().find_map(|priority| {
            self.slots[priority.slot()]
                .pop_front()
                .map(|msg| QueuedMsg { priority, msg })
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().map(VecDeque::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(VecDeque::is_empty)
    }

    /// Queued messages in drain order.
    pub fn iter(&self) -> impl Iterator<Item = &Msg> {
        self.slots.iter().flatten()
    }

    /// Remove and return everything in drain order.
    pub fn drain(&mut self) -> Vec<QueuedMsg> {
        std::iter::from_fn(|| self.pop()).collect()
    }
}

fn same_request(a: &Msg, b: &Msg) -> bool {
    a.node_id() == b.node_id()
        && a.instance() == b.instance()
        && a.class_id() == b.class_id()
        && a.payload() == b.payload()
}

impl SendQueue for MsgQueue {
    fn send_msg(&mut self, msg: Msg, priority: QueuePriority) -> Result<(), ZWaveError> {
        let slot = &mut self.slots[priority.slot()];
        if slot.iter().any(|queued| same_request(queued, &msg)) {
            log::debug!(
                "node {}: {} already queued at {priority:?}, skipping",
                msg.node_id(),
                msg.label()
            );
            return Ok(());
        }
        slot.push_back(msg);
        Ok(())
    }
}

impl SendQueue for UnboundedSender<QueuedMsg> {
    fn send_msg(&mut self, msg: Msg, priority: QueuePriority) -> Result<(), ZWaveError> {
        self.send(QueuedMsg { priority, msg })
            .map_err(|_| ZWaveError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_by_priority_then_fifo() {
        let mut q = MsgQueue::new();
        q.send_msg(Msg::new("poll", 1, 0x25).append(0x02), QueuePriority::Poll)
            .expect("send");
        q.send_msg(Msg::new("q1", 1, 0x71).append(0x07), QueuePriority::Query)
            .expect("send");
        q.send_msg(Msg::new("set", 1, 0x25).append(0x01).append(0xFF), QueuePriority::Command)
            .expect("send");
        q.send_msg(Msg::new("q2", 1, 0x86).append(0x11), QueuePriority::Query)
            .expect("send");
        let labels: Vec<String> = q.drain().into_iter().map(|m| m.msg.label().to_string()).collect();
        assert_eq!(labels, vec!["set", "q1", "q2", "poll"]);
        assert!(q.is_empty());
    }

    #[test]
    fn identical_request_is_queued_once() {
        let mut q = MsgQueue::new();
        q.send_msg(Msg::new("get", 3, 0x80).append(0x02), QueuePriority::Poll)
            .expect("send");
        q.send_msg(Msg::new("get again", 3, 0x80).append(0x02), QueuePriority::Poll)
            .expect("send");
        q.send_msg(Msg::new("other node", 4, 0x80).append(0x02), QueuePriority::Poll)
            .expect("send");
        assert_eq!(q.len(), 2);
    }
}
