#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::module_name_repetitions
)]

//! zwave_cc
//!
//! Z-Wave command-class decoding and the per-node value model behind it.
//!
//! Main pieces:
//! - `ValueId` / `Value`: typed device properties with refresh verification
//!   (a changed reading is committed only after it is seen twice in a row)
//! - `command_class`: decoders that turn report payloads into value updates
//!   and build outgoing Get/Set requests
//! - `Node`: owns a device's command classes and values, dispatches inbound
//!   frames and queues notifications
//! - `SendQueue`: where outgoing `Msg`s go; an in-memory `MsgQueue` and a
//!   tokio channel sender are provided
//!
//! ```no_run
//! use zwave_cc::{MsgQueue, Node, RequestFlags};
//!
//! zwave_cc::init_defaults().unwrap();
//! let mut node = Node::new(0x0184_ABCD, 5);
//! node.add_command_class(0x71).unwrap();
//! let mut queue = MsgQueue::new();
//! node.request_state(RequestFlags::STATIC | RequestFlags::DYNAMIC, &mut queue);
//! node.handle_frame(&[0x71, 0x05, 0x01, 0x63], 1, &mut queue);
//! for n in node.drain_notifications() {
//!     println!("{n:?}");
//! }
//! ```

pub mod command_class;
pub mod config;
pub mod crc16;
pub mod error;
pub mod msg;
pub mod node;
pub mod notification;
pub mod persist;
pub mod queue;
pub mod registry;
pub mod toml_helpers;
pub mod value;
pub mod value_id;
pub mod value_store;

pub use command_class::{CommandClass, CommandClassHandler, Handled, RequestFlags, StaticRequests};
pub use error::ZWaveError;
pub use msg::Msg;
pub use node::{Node, NodeData};
pub use notification::Notification;
pub use queue::{MsgQueue, QueuePriority, QueuedMsg, SendQueue};
pub use value::{RefreshOutcome, Value, ValueContent, ValueData};
pub use value_id::{Genre, ValueId, ValueType};

/// Install the embedded command-class registry.
///
/// A registry that is already installed is left untouched, so calling this
/// more than once (or after `register_or_merge` of an application file) is
/// harmless.
pub fn init_defaults() -> Result<(), ZWaveError> {
    let reg = registry::CommandClassRegistry::embedded()?;
    match reg.set_global() {
        Ok(()) | Err(ZWaveError::AlreadyRegistered) => Ok(()),
        Err(e) => Err(e),
    }
}
