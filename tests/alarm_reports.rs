use zwave_cc::command_class::alarm::{self, INDEX_LEVEL, INDEX_SOURCE_NODE_ID, INDEX_TYPE, TYPE_INDEX_BASE};
use zwave_cc::{Handled, MsgQueue, Node, Notification, RequestFlags};

const HOME: u32 = 0x0184_ABCD;

fn alarm_node(version: u8) -> Node {
    let mut node = Node::new(HOME, 5);
    node.add_command_class(alarm::ID)
        .expect("add alarm")
        .set_version(version);
    node.drain_notifications();
    node
}

#[test]
fn v2_report_fills_source_and_type_values() {
    let mut node = alarm_node(2);
    let mut queue = MsgQueue::new();

    let handled = node.handle_frame(&[0x71, 0x05, 0x01, 0x63, 0x00, 0x05, 0x03, 0x50], 1, &mut queue);
    assert_eq!(handled, Handled::Consumed);

    let byte = |index| node.get_value(alarm::ID, 1, index).and_then(|v| v.as_byte());
    assert_eq!(byte(INDEX_TYPE), Some(0x01));
    assert_eq!(byte(INDEX_LEVEL), Some(0x63));
    assert_eq!(byte(INDEX_SOURCE_NODE_ID), Some(0x05));
    assert_eq!(byte(TYPE_INDEX_BASE + 3), Some(0x50));
    assert_eq!(
        node.get_value(alarm::ID, 1, TYPE_INDEX_BASE + 3).map(|v| v.label().to_string()),
        Some("Carbon Dioxide".to_string())
    );

    let changed = node
        .drain_notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::ValueChanged(_)))
        .count();
    assert_eq!(changed, 4);
}

#[test]
fn v1_node_ignores_trailing_bytes() {
    let mut node = alarm_node(1);
    let mut queue = MsgQueue::new();
    node.handle_frame(&[0x71, 0x05, 0x01, 0x63, 0x00, 0x05, 0x03, 0x50], 1, &mut queue);

    assert_eq!(node.get_value(alarm::ID, 1, INDEX_LEVEL).and_then(|v| v.as_byte()), Some(0x63));
    assert!(node.get_value(alarm::ID, 1, INDEX_SOURCE_NODE_ID).is_none());
    assert!(node.get_value(alarm::ID, 1, TYPE_INDEX_BASE + 3).is_none());
}

#[test]
fn truncated_report_changes_nothing() {
    let mut node = alarm_node(2);
    let mut queue = MsgQueue::new();
    assert_eq!(node.handle_frame(&[0x71, 0x05, 0x01], 1, &mut queue), Handled::Rejected);
    assert_eq!(node.get_value(alarm::ID, 1, INDEX_TYPE).map(|v| v.is_set()), Some(false));
    assert!(node.drain_notifications().is_empty());
}

#[test]
fn supported_report_creates_only_named_types() {
    let mut node = alarm_node(2);
    let mut queue = MsgQueue::new();

    // types 0, 2, 7 and 11; 11 has no name and is skipped
    let handled = node.handle_frame(&[0x71, 0x08, 0x02, 0b1000_0101, 0b0000_1000], 1, &mut queue);
    assert_eq!(handled, Handled::Consumed);

    for t in [0u8, 2, 7] {
        assert!(node.get_value(alarm::ID, 1, TYPE_INDEX_BASE + t).is_some(), "type {t}");
    }
    for t in [1u8, 3, 4, 5, 6, 8, 9, 10, 11] {
        assert!(node.get_value(alarm::ID, 1, TYPE_INDEX_BASE + t).is_none(), "type {t}");
    }
    assert!(node.get_value(alarm::ID, 1, INDEX_SOURCE_NODE_ID).is_some());

    // dynamic pass asks for each supported type
    assert!(node.request_state(RequestFlags::DYNAMIC, &mut queue));
    let gets: Vec<Vec<u8>> = queue.drain().into_iter().map(|q| q.msg.payload().to_vec()).collect();
    assert_eq!(gets, vec![vec![0x04, 0x00, 0], vec![0x04, 0x00, 2], vec![0x04, 0x00, 7]]);
}

#[test]
fn changed_level_needs_confirmation() {
    let mut node = alarm_node(1);
    let mut queue = MsgQueue::new();
    let level_id = node
        .get_value(alarm::ID, 1, INDEX_LEVEL)
        .map(|v| v.id())
        .expect("level value");

    node.handle_frame(&[0x71, 0x05, 0x01, 0x10], 1, &mut queue);
    node.drain_notifications();
    assert!(queue.is_empty());

    // first differing sample is held back and re-requested
    node.handle_frame(&[0x71, 0x05, 0x01, 0x20], 1, &mut queue);
    assert_eq!(node.value(&level_id).and_then(|v| v.as_byte()), Some(0x10));
    let notes = node.drain_notifications();
    assert!(!notes.contains(&Notification::ValueChanged(level_id)));
    assert_eq!(queue.len(), 1);
    let get = queue.pop().expect("re-request");
    assert_eq!(get.msg.payload(), &[0x04]);

    // second sample confirms it
    node.handle_frame(&[0x71, 0x05, 0x01, 0x20], 1, &mut queue);
    assert_eq!(node.value(&level_id).and_then(|v| v.as_byte()), Some(0x20));
    assert!(node
        .drain_notifications()
        .contains(&Notification::ValueChanged(level_id)));
    assert!(queue.is_empty());
}

#[test]
fn static_pass_asks_for_supported_types_on_v2() {
    let mut node = alarm_node(2);
    let mut queue = MsgQueue::new();
    node.request_state(RequestFlags::STATIC, &mut queue);
    let labels: Vec<String> = queue.iter().map(|m| m.label().to_string()).collect();
    assert!(labels.contains(&"AlarmCmd_SupportedGet".to_string()));
}
