//! Shared counter contention: every caller sees a distinct value.

use astrid::{Counter, Paths};

#[test]
fn concurrent_attachments_see_a_permutation() {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());
    let counter_path = paths.voice_counter();

    Counter::create(&counter_path).unwrap();

    const WORKERS: usize = 2;
    const PER_WORKER: usize = 10_000;

    let mut handles = Vec::new();
    for _ in 0..WORKERS {
        let path = counter_path.clone();
        handles.push(std::thread::spawn(move || {
            // Each worker has its own attachment, like a separate
            // process would.
            let mut counter = Counter::attach(&path).unwrap();
            (0..PER_WORKER)
                .map(|_| counter.read_and_increment().unwrap())
                .collect::<Vec<u64>>()
        }));
    }

    let mut seen: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    seen.sort_unstable();
    seen.dedup();

    assert_eq!(seen.len(), WORKERS * PER_WORKER, "duplicate ids observed");
    assert_eq!(seen.first(), Some(&1));
    assert_eq!(seen.last(), Some(&((WORKERS * PER_WORKER) as u64)));

    Counter::destroy(&counter_path).unwrap();
}
