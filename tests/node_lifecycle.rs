use zwave_cc::command_class::{alarm, battery, sensor_multilevel, switch_binary, version};
use zwave_cc::value::Decimal;
use zwave_cc::{Handled, MsgQueue, Node, Notification, QueuePriority, RequestFlags, StaticRequests, ZWaveError};

fn multi_class_node() -> Node {
    zwave_cc::init_defaults().expect("defaults");
    let mut node = Node::new(0x0184_ABCD, 12);
    for id in [version::ID, alarm::ID, sensor_multilevel::ID, battery::ID, switch_binary::ID] {
        node.add_command_class(id).expect("add class");
    }
    node
}

#[test]
fn version_negotiation_runs_before_other_discovery() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();

    assert!(node.request_state(RequestFlags::STATIC, &mut queue));
    let payloads: Vec<Vec<u8>> = queue.drain().into_iter().map(|q| q.msg.payload().to_vec()).collect();
    // class version queries for the two multi-version decoders, then the
    // node's own version report; no alarm or sensor discovery yet
    assert_eq!(
        payloads,
        vec![vec![0x13, sensor_multilevel::ID], vec![0x13, alarm::ID], vec![0x11]]
    );

    assert_eq!(
        node.handle_frame(&[0x86, 0x14, alarm::ID, 0x02], 1, &mut queue),
        Handled::Negotiated {
            class_id: alarm::ID,
            version: 2
        }
    );
    // a newer version than the decoder knows is clamped
    node.handle_frame(&[0x86, 0x14, sensor_multilevel::ID, 0x09], 1, &mut queue);
    assert_eq!(node.command_class(alarm::ID).map(|c| c.version()), Some(2));
    assert_eq!(node.command_class(sensor_multilevel::ID).map(|c| c.version()), Some(5));
    assert!(!node
        .command_class(alarm::ID)
        .expect("alarm")
        .state()
        .has_static_request(StaticRequests::VERSION));

    node.handle_frame(&[0x86, 0x12, 0x03, 0x04, 0x05, 0x01, 0x02], 1, &mut queue);
    let text = |index| {
        node.get_value(version::ID, 1, index)
            .and_then(|v| v.as_str().map(str::to_string))
    };
    assert_eq!(text(version::INDEX_LIBRARY).as_deref(), Some("3"));
    assert_eq!(text(version::INDEX_PROTOCOL).as_deref(), Some("4.05"));
    assert_eq!(text(version::INDEX_APPLICATION).as_deref(), Some("1.02"));

    assert!(node.request_state(RequestFlags::STATIC, &mut queue));
    let labels: Vec<String> = queue.iter().map(|m| m.label().to_string()).collect();
    assert_eq!(
        labels,
        vec!["SensorMultilevelCmd_SupportedGet", "AlarmCmd_SupportedGet"]
    );
}

#[test]
fn version_zero_removes_class_and_values() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();
    let type_id = node
        .get_value(alarm::ID, 1, alarm::INDEX_TYPE)
        .map(|v| v.id())
        .expect("alarm type");
    node.drain_notifications();

    node.handle_frame(&[0x86, 0x14, alarm::ID, 0x00], 1, &mut queue);
    assert!(node.command_class(alarm::ID).is_none());
    assert!(node.value(&type_id).is_none());
    assert!(node
        .drain_notifications()
        .contains(&Notification::ValueRemoved(type_id)));
    assert_eq!(node.handle_frame(&[0x71, 0x05, 0x01, 0x63], 1, &mut queue), Handled::No);
}

#[test]
fn sensor_reports_create_values_with_units() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();

    // temperature, precision 1, size 2, 25.0 C
    node.handle_frame(&[0x31, 0x05, 0x01, 0x22, 0x00, 0xFA], 1, &mut queue);
    let temp = node.get_value(sensor_multilevel::ID, 1, 1).expect("temperature");
    assert_eq!(temp.label(), "Temperature");
    assert_eq!(temp.units(), "C");
    assert_eq!(temp.as_decimal(), Some(Decimal::new(25.0, 1)));
    assert_eq!(temp.get_as_string(), "25.0");

    // same type reported in Fahrenheit switches the units
    node.handle_frame(&[0x31, 0x05, 0x01, 0x2A, 0x03, 0x1B], 1, &mut queue);
    assert_eq!(node.get_value(sensor_multilevel::ID, 1, 1).map(|v| v.units()), Some("F"));

    assert_eq!(
        node.handle_frame(&[0x31, 0x05, 0x01, 0x22, 0x00], 1, &mut queue),
        Handled::Rejected
    );
}

#[test]
fn low_battery_warning_reads_as_zero() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();
    node.handle_frame(&[0x80, 0x03, 0xFF], 1, &mut queue);
    assert_eq!(node.get_value(battery::ID, 1, 0).and_then(|v| v.as_byte()), Some(0));
}

#[test]
fn set_value_queues_command() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();
    let switch = node.get_value(switch_binary::ID, 1, 0).map(|v| v.id()).expect("switch");

    node.set_value_from_string(&switch, "True", &mut queue).expect("set");
    let sent = queue.pop().expect("set queued");
    assert_eq!(sent.priority, QueuePriority::Command);
    assert_eq!(sent.msg.payload(), &[0x01, 0xFF]);
    // target recorded, value still waits for the report
    assert_eq!(node.value(&switch).and_then(|v| v.as_bool()), Some(false));

    node.handle_frame(&[0x25, 0x03, 0xFF], 1, &mut queue);
    assert_eq!(node.value(&switch).and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn read_only_values_refuse_set() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();
    let level = node.get_value(alarm::ID, 1, alarm::INDEX_LEVEL).map(|v| v.id()).expect("level");
    let err = node
        .set_value(&level, zwave_cc::ValueData::Byte(1), &mut queue)
        .err()
        .expect("read-only");
    assert!(matches!(err, ZWaveError::ReadOnly(_)));
    assert!(queue.is_empty());
}

#[test]
fn poll_honours_intensity() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();
    let level = node.get_value(battery::ID, 1, 0).map(|v| v.id()).expect("battery");
    node.value_mut(&level).expect("battery").set_poll_intensity(3);

    assert_eq!(node.poll(1, &mut queue), 0);
    assert_eq!(node.poll(3, &mut queue), 1);
    let get = queue.pop().expect("poll get");
    assert_eq!(get.priority, QueuePriority::Poll);
    assert_eq!(get.msg.label(), "BatteryCmd_Get");
}

#[test]
fn set_only_class_is_never_queried() {
    let mut node = multi_class_node();
    let mut queue = MsgQueue::new();
    node.command_class_mut(battery::ID)
        .expect("battery")
        .state_mut()
        .set_get_supported(false);
    let level = node.get_value(battery::ID, 1, 0).map(|v| v.id()).expect("battery");
    assert!(!node.refresh_value(&level, &mut queue));
    assert!(queue.is_empty());
}

#[test]
fn unknown_class_is_refused() {
    let mut node = Node::new(1, 2);
    assert!(matches!(
        node.add_command_class(0x99),
        Err(ZWaveError::UnknownCommandClass(0x99))
    ));
    node.add_command_class(battery::ID).expect("first add");
    assert!(matches!(
        node.add_command_class(battery::ID),
        Err(ZWaveError::AlreadyRegistered)
    ));
}
