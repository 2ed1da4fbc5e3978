//! Notemap trigger semantics against a live broker queue.

use std::time::Duration;

use astrid::{Message, MessageKind, MessageQueue, Notemap, Paths};

#[test]
fn trigger_replays_live_records_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let map = Notemap::new(paths.clone(), 0, 60);

    let mut m1 = Message::new(MessageKind::Play, "keys").unwrap();
    m1.params = "m1".to_string();
    let mut m2 = m1.clone();
    m2.params = "m2".to_string();
    let mut m3 = m1.clone();
    m3.params = "m3".to_string();

    map.append(&m1).unwrap();
    map.append(&m2).unwrap();
    map.append(&m3).unwrap();
    map.remove(1).unwrap();

    let mut broker = MessageQueue::open_broker(&paths).unwrap();
    map.trigger().unwrap();

    // Exactly m1 then m3: the removed slot stays silent but keeps its
    // offset, so a later remove(2) would still hit m3's record.
    assert_eq!(broker.recv().unwrap().params, "m1");
    assert_eq!(broker.recv().unwrap().params, "m3");
    assert!(broker
        .recv_timeout(Duration::from_millis(50))
        .unwrap()
        .is_none());
}

#[test]
fn removing_a_record_is_idempotent_for_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let map = Notemap::new(paths, 0, 61);

    for i in 0..4 {
        let mut msg = Message::new(MessageKind::Trigger, "keys").unwrap();
        msg.voice_id = i;
        map.append(&msg).unwrap();
    }

    map.remove(2).unwrap();
    let live: Vec<u64> = map.messages().unwrap().iter().map(|m| m.voice_id).collect();
    assert_eq!(live, vec![0, 1, 3]);

    // Removing the same slot again changes nothing.
    map.remove(2).unwrap();
    let live: Vec<u64> = map.messages().unwrap().iter().map(|m| m.voice_id).collect();
    assert_eq!(live, vec![0, 1, 3]);
}
