use crate::channel::{NODE_SLOT_COUNT, ScratchChannel};
use crate::handle::NodeHandle;
use crate::point::Point;

fn handle_with_id(id: u64) -> NodeHandle {
    let mut fields = [0u32; 6];
    fields[0] = id as u32;
    fields[1] = (id >> 32) as u32;
    fields[2] = 3;
    fields[3] = 17;
    NodeHandle::from_fields(fields)
}

#[test]
fn node_round_trip_per_slot() {
    let mut channel = ScratchChannel::new();
    for slot in 0..NODE_SLOT_COUNT {
        channel.write_node(&handle_with_id(100 + slot as u64), slot);
    }
    for slot in 0..NODE_SLOT_COUNT {
        assert_eq!(channel.read_node(slot).id(), 100 + slot as u64);
    }
}

#[test]
fn slots_are_volatile_across_writes() {
    let mut channel = ScratchChannel::new();
    channel.write_node(&handle_with_id(1), 0);
    let first = channel.read_node(0);
    channel.write_node(&handle_with_id(2), 0);

    // The copied-out handle survives; the slot does not.
    assert_eq!(first.id(), 1);
    assert_eq!(channel.read_node(0).id(), 2);
}

#[test]
fn empty_slot_reads_null() {
    let channel = ScratchChannel::new();
    assert!(channel.read_node(5).is_null());
}

#[test]
fn point_round_trip() {
    let mut channel = ScratchChannel::new();
    channel.write_point(Point::new(12, 34));
    assert_eq!(channel.read_point(), Point::new(12, 34));

    channel.write_point(Point::ZERO);
    assert_eq!(channel.read_point(), Point::ZERO);
}
