use granite::buffer::lru_replacer::LruReplacer;

#[test]
fn sample_test() {
    let replacer = LruReplacer::new(7);

    // Scenario: unpin six elements, i.e. add them to the replacer.
    replacer.unpin(1);
    replacer.unpin(2);
    replacer.unpin(3);
    replacer.unpin(4);
    replacer.unpin(5);
    replacer.unpin(6);
    replacer.unpin(1);
    assert_eq!(replacer.size(), 6);

    // Scenario: get three victims from the lru.
    assert_eq!(replacer.victim(), Some(1));
    assert_eq!(replacer.victim(), Some(2));
    assert_eq!(replacer.victim(), Some(3));

    // Scenario: pin elements in the replacer.
    // Note that 3 has already been victimized, so pinning 3 should have
    // no effect.
    replacer.pin(3);
    replacer.pin(4);
    assert_eq!(replacer.size(), 2);

    // Scenario: unpin 4. We expect that the reference bit of 4 will be
    // set to 1.
    replacer.unpin(4);

    // Scenario: continue looking for victims. We expect these victims.
    assert_eq!(replacer.victim(), Some(5));
    assert_eq!(replacer.victim(), Some(6));
    assert_eq!(replacer.victim(), Some(4));
    assert_eq!(replacer.victim(), None);
    assert_eq!(replacer.size(), 0);
}

#[test]
fn capacity_test() {
    let replacer = LruReplacer::new(3);
    for frame_id in 0..10 {
        replacer.unpin(frame_id);
    }
    // Unpins past capacity are dropped.
    assert_eq!(replacer.size(), 3);
    assert_eq!(replacer.victim(), Some(0));
    assert_eq!(replacer.victim(), Some(1));
    assert_eq!(replacer.victim(), Some(2));
    assert_eq!(replacer.victim(), None);
}

#[test]
fn victim_order_follows_unpin_order() {
    let replacer = LruReplacer::new(10);
    replacer.unpin(5);
    replacer.unpin(3);
    replacer.unpin(9);
    replacer.pin(3);
    replacer.unpin(3);
    assert_eq!(replacer.victim(), Some(5));
    assert_eq!(replacer.victim(), Some(9));
    assert_eq!(replacer.victim(), Some(3));
}

#[test]
fn concurrent_unpin_victim() {
    use std::sync::Arc;
    use std::thread;

    let replacer = Arc::new(LruReplacer::new(1000));
    let mut handles = Vec::new();
    for t in 0..4 {
        let replacer = Arc::clone(&replacer);
        handles.push(thread::spawn(move || {
            for i in 0..250 {
                replacer.unpin(t * 250 + i);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(replacer.size(), 1000);

    let mut victims = std::collections::HashSet::new();
    while let Some(frame_id) = replacer.victim() {
        assert!(victims.insert(frame_id), "victim {} returned twice", frame_id);
    }
    assert_eq!(victims.len(), 1000);
}
