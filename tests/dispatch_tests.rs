//! End-to-end deadline dispatch through a live sequencer.
//!
//! These spin up the real feeder and dispatcher threads over named
//! queues under a temporary root.

use std::time::Duration;

use astrid::{now_seconds, queue, Message, MessageKind, MessageQueue, Paths, Sequencer};

fn temp_paths() -> (tempfile::TempDir, Paths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    (dir, paths)
}

fn play(instrument: &str, voice_id: u64, timestamp: f64) -> Message {
    let mut msg = Message::new(MessageKind::Play, instrument).unwrap();
    msg.voice_id = voice_id;
    msg.timestamp = timestamp;
    msg
}

#[test]
fn messages_dispatch_in_deadline_order() {
    let (_dir, paths) = temp_paths();
    let seq = Sequencer::start(paths.clone()).unwrap();
    let mut playq = MessageQueue::open_play(&paths, "pulsar").unwrap();

    let now = now_seconds();
    queue::send(&paths, &play("pulsar", 1, now + 0.05)).unwrap();
    queue::send(&paths, &play("pulsar", 2, now + 0.01)).unwrap();
    queue::send(&paths, &play("pulsar", 3, now + 0.10)).unwrap();

    let mut order = Vec::new();
    for _ in 0..3 {
        let msg = playq
            .recv_timeout(Duration::from_secs(5))
            .unwrap()
            .expect("dispatch before timeout");
        order.push(msg.voice_id);
    }
    assert_eq!(order, vec![2, 1, 3]);

    seq.shutdown().unwrap();
    seq.join().unwrap();
}

#[test]
fn stop_cancels_future_messages_for_voice() {
    let (_dir, paths) = temp_paths();
    let seq = Sequencer::start(paths.clone()).unwrap();
    let mut playq = MessageQueue::open_play(&paths, "pulsar").unwrap();

    // A play a full second out, then an immediate stop for the same
    // voice.
    queue::send(&paths, &play("pulsar", 7, now_seconds() + 1.0)).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let mut stop = Message::new(MessageKind::StopVoice, "pulsar").unwrap();
    stop.voice_id = 7;
    queue::send(&paths, &stop).unwrap();

    // Past the play's deadline: nothing may have reached the play queue.
    let got = playq.recv_timeout(Duration::from_millis(1300)).unwrap();
    assert!(got.is_none(), "voice 7 was dispatched after its stop");

    seq.shutdown().unwrap();
    seq.join().unwrap();
}

#[test]
fn shutdown_message_winds_down_workers() {
    let (_dir, paths) = temp_paths();
    let seq = Sequencer::start(paths.clone()).unwrap();

    queue::send(&paths, &Message::new(MessageKind::Shutdown, "sequencer").unwrap()).unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !seq.workers_finished() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(seq.workers_finished());
    seq.join().unwrap();
}
