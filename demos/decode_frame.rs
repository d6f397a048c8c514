use zwave_cc::{MsgQueue, Node};

fn hex_to_bytes(s: &str) -> Result<Vec<u8>, std::num::ParseIntError> {
    s.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16))
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    zwave_cc::init_defaults()?;

    let mut node = Node::new(0x0184_ABCD, 5);
    node.add_command_class(0x86)?;
    node.add_command_class(0x71)?.set_version(2);
    node.add_command_class(0x5B)?;
    node.add_command_class(0x56)?;
    node.add_command_class(0x20)?;
    node.drain_notifications();

    let frames = [
        // alarm v2: smoke level 0x63 from node 5, CO2 level 0x50
        "71 05 01 63 00 05 03 50",
        // three scenes, then scene 2 held for 5 seconds
        "5B 02 03",
        "5B 03 00 05 02",
        // basic report wrapped in CRC-16
        "56 01 20 03 05 DC FD",
    ];
    let mut queue = MsgQueue::new();
    for s in frames {
        let frame = hex_to_bytes(s)?;
        let handled = node.handle_frame(&frame, 1, &mut queue);
        println!("{s:<26} -> {handled:?}");
        for n in node.drain_notifications() {
            let id = n.value_id();
            let text = node.value(&id).map(|v| v.get_as_string()).unwrap_or_default();
            println!("    {n:?} = {text}");
        }
    }
    for q in queue.drain() {
        println!("queued {:?}: {:?}", q.priority, q.msg);
    }
    Ok(())
}
