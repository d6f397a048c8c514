use zwave_cc::command_class::{basic, crc16_encap};
use zwave_cc::crc16::crc16;
use zwave_cc::{Handled, Msg, MsgQueue, Node, ZWaveError};

/// `[0x56][0x01][inner..][crc]` around `inner`.
fn wrap(inner: &[u8]) -> Vec<u8> {
    let mut body = vec![0x01];
    body.extend_from_slice(inner);
    let crc = crc16(&body);
    let mut frame = vec![crc16_encap::ID];
    frame.extend_from_slice(&body);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame
}

fn node_with_basic() -> Node {
    let mut node = Node::new(1, 3);
    node.add_command_class(crc16_encap::ID).expect("add crc16");
    node.add_command_class(basic::ID).expect("add basic");
    node
}

#[test]
fn known_vector() {
    assert_eq!(wrap(&[0x20, 0x02]), vec![0x56, 0x01, 0x20, 0x02, 0x4D, 0x26]);
}

#[test]
fn verified_frame_reaches_inner_class() {
    let mut node = node_with_basic();
    let mut queue = MsgQueue::new();

    let frame = wrap(&[0x20, 0x03, 0x05]);
    assert_eq!(node.handle_frame(&frame, 1, &mut queue), Handled::Consumed);
    assert_eq!(node.get_value(basic::ID, 1, 0).and_then(|v| v.as_byte()), Some(5));
}

#[test]
fn any_corruption_is_dropped() {
    let frame = wrap(&[0x20, 0x03, 0x05]);
    // byte 0 is the class id and byte 1 the sub-command; flip everything after
    for i in 2..frame.len() {
        let mut node = node_with_basic();
        let mut queue = MsgQueue::new();
        let mut bad = frame.clone();
        bad[i] ^= 0x01;
        assert_eq!(node.handle_frame(&bad, 1, &mut queue), Handled::Rejected, "byte {i}");
        assert_eq!(node.get_value(basic::ID, 1, 0).map(|v| v.is_set()), Some(false));
    }
}

#[test]
fn checksum_round_trips_for_varied_buffers() {
    let long: Vec<u8> = (0..=u8::MAX).collect();
    let buffers: [Vec<u8>; 4] = [
        vec![0x20, 0x02],
        vec![0x00; 3],
        long,
        vec![0xFF; 64],
    ];
    for inner in &buffers {
        let frame = wrap(inner);
        let (class_id, payload) = crc16_encap::unwrap(&frame[1..]).expect("valid checksum");
        assert_eq!(class_id, inner[0], "inner len {}", inner.len());
        assert_eq!(payload, &inner[1..]);
    }

    // a class id with nothing after it is too short to carry a command
    assert!(matches!(
        crc16_encap::unwrap(&wrap(&[0x20])[1..]),
        Err(ZWaveError::Truncated { needed: 5, actual: 4, .. })
    ));
}

#[test]
fn short_frame_is_refused_before_checksum() {
    assert!(matches!(
        crc16_encap::unwrap(&[0x01, 0x20, 0x4D, 0x26]),
        Err(ZWaveError::Truncated { needed: 5, actual: 4, .. })
    ));
}

#[test]
fn envelope_depth_is_limited() {
    let mut node = node_with_basic();
    let mut queue = MsgQueue::new();
    let inner = wrap(&[0x20, 0x03, 0x05]);
    let twice = wrap(&inner);
    let thrice = wrap(&twice);
    assert_eq!(node.handle_frame(&twice, 1, &mut queue), Handled::Consumed);
    assert_eq!(node.handle_frame(&thrice, 1, &mut queue), Handled::Rejected);
}

#[test]
fn outgoing_messages_can_be_wrapped() {
    let get = Msg::new("BasicCmd_Get", 3, basic::ID).append(0x02).with_expected_reply(0x03);
    let wrapped = crc16_encap::encapsulate(&get);
    assert_eq!(wrapped.class_id(), crc16_encap::ID);
    assert_eq!(wrapped.payload(), &[0x01, 0x20, 0x02, 0x4D, 0x26]);
    assert_eq!(wrapped.expected_reply(), Some(0x03));

    let (class_id, inner) = crc16_encap::unwrap(wrapped.payload()).expect("round trip");
    assert_eq!((class_id, inner), (basic::ID, &[0x02][..]));
}
