use zwave_cc::command_class::{alarm, central_scene, switch_binary};
use zwave_cc::persist::{load_node, load_node_from_path, save_node, save_node_to_path};
use zwave_cc::{MsgQueue, Node, StaticRequests};

fn populated_node() -> Node {
    let mut node = Node::new(0x0184_ABCD, 7);
    node.add_command_class(alarm::ID).expect("alarm").set_version(2);
    node.add_command_class(switch_binary::ID).expect("switch");
    node.add_command_class(central_scene::ID).expect("scene");
    node.set_scene_count(2).expect("scene count");

    let mut queue = MsgQueue::new();
    node.handle_frame(&[0x71, 0x05, 0x01, 0x63, 0x00, 0x05, 0x03, 0x50], 1, &mut queue);
    node.handle_frame(&[0x25, 0x03, 0xFF], 1, &mut queue);
    node.handle_frame(&[0x5B, 0x03, 0x00, 0x05, 0x02], 1, &mut queue);
    node
}

#[test]
fn saved_node_loads_back() {
    let node = populated_node();
    let text = save_node(&node).expect("save");
    let loaded = load_node(&text).expect("load");

    assert_eq!(loaded.home_id(), node.home_id());
    assert_eq!(loaded.node_id(), 7);
    assert_eq!(loaded.values().len(), node.values().len());
    for v in node.values().iter() {
        let back = loaded.value(&v.id()).expect("value restored");
        assert_eq!(back.get_as_string(), v.get_as_string(), "{}", v.id());
        assert_eq!(back.label(), v.label());
        assert_eq!(back.units(), v.units());
        assert_eq!(back.is_read_only(), v.is_read_only());
    }

    assert_eq!(loaded.command_class(alarm::ID).map(|c| c.version()), Some(2));
    assert_eq!(
        loaded
            .get_value(alarm::ID, 1, alarm::TYPE_INDEX_BASE + 3)
            .and_then(|v| v.as_byte()),
        Some(0x50)
    );
    match loaded.command_class(central_scene::ID) {
        Some(zwave_cc::CommandClass::CentralScene(cs)) => {
            assert_eq!(cs.configured_scene_count(), Some(2));
        }
        other => panic!("central scene missing: {other:?}"),
    }
}

#[test]
fn static_progress_survives_restart() {
    let mut node = Node::new(1, 2);
    node.add_command_class(alarm::ID).expect("alarm");
    node.command_class_mut(alarm::ID)
        .expect("alarm")
        .state_mut()
        .clear_static_request(StaticRequests::VALUES);

    let loaded = load_node(&save_node(&node).expect("save")).expect("load");
    let state = loaded.command_class(alarm::ID).expect("alarm").state();
    assert!(!state.has_static_request(StaticRequests::VALUES));
    assert!(state.has_static_request(StaticRequests::VERSION));
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("node_7.toml");
    let node = populated_node();
    save_node_to_path(&node, &path).expect("write");

    let loaded = load_node_from_path(&path).expect("read");
    assert_eq!(
        loaded.get_value(switch_binary::ID, 1, 0).and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(
        loaded.get_value(central_scene::ID, 1, 2).and_then(|v| v.as_int()),
        Some(5)
    );
}

#[test]
fn unknown_records_are_skipped() {
    let s = r#"
home_id = 1
node_id = 2

[[class]]
id = 153

[[class]]
id = 37

[[value]]
genre = "user"
class = 37
instance = 1
index = 0
type = "bool"
label = "Switch"
value = "True"

[[value]]
genre = "nonsense"
class = 37
instance = 1
index = 4
type = "bool"
label = "Bad"
"#;
    let node = load_node(s).expect("load");
    assert!(node.command_class(0x99).is_none());
    assert_eq!(node.values().len(), 1);
    assert_eq!(node.get_value(0x25, 1, 0).and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_node_from_path(&dir.path().join("absent.toml"))
        .err()
        .expect("must fail");
    assert!(matches!(err, zwave_cc::ZWaveError::Io(_)));
}
