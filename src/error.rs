use thiserror::Error;

use crate::value_id::{ValueId, ValueType};

#[derive(Error, Debug)]
pub enum ZWaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("frame too short for command 0x{command:02X}: need {needed} bytes, got {actual}")]
    Truncated {
        command: u8,
        needed: usize,
        actual: usize,
    },
    #[error("crc mismatch: frame carries 0x{expected:04X}, computed 0x{actual:04X}")]
    CrcMismatch { expected: u16, actual: u16 },
    #[error("value is read-only: {0}")]
    ReadOnly(ValueId),
    #[error("value {id} is not of type {expected}")]
    TypeMismatch { id: ValueId, expected: ValueType },
    #[error("{value} is outside {min}..={max} for {id}")]
    OutOfRange {
        id: ValueId,
        value: i64,
        min: i32,
        max: i32,
    },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unknown command class 0x{0:02X}")]
    UnknownCommandClass(u8),
    #[error("already registered")]
    AlreadyRegistered,
    #[error("send queue closed")]
    QueueClosed,
}
