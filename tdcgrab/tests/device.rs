use std::time::Duration;

use tdcgrab::device::{Batch, ReplayTagger, SimTagger, Tagger};
use tdcgrab::error::DeviceError;
use tdctools::Tag;

#[test]
fn sim_batches_are_ordered_and_respect_enablement() {
    let mut sim = SimTagger::new(1);
    sim.open().unwrap();
    for ch in [0, 1, 2, 4] {
        sim.set_enabled(ch, true).unwrap();
    }
    // First read only establishes the wall-clock baseline
    sim.read_batch(true).unwrap();
    std::thread::sleep(Duration::from_millis(30));

    let batch = sim.read_batch(false).unwrap();
    assert!(!batch.tags.is_empty());
    assert!(!batch.data_lost);
    for w in batch.tags.windows(2) {
        assert!(w[0].time <= w[1].time);
    }
    assert!(batch.tags.iter().all(|t| [0, 1, 2, 4].contains(&t.channel)));
    assert!(batch.tags.iter().any(|t| t.channel == 0));
    // Line 3 stayed disabled, so no gate tags
    assert!(batch.tags.iter().all(|t| t.channel != 3));

    sim.close();
    assert!(matches!(sim.read_batch(false), Err(DeviceError::Closed)));
}

#[test]
fn sim_stop_delays_track_their_settings() {
    let mut sim = SimTagger::new(3).delays(100, 150).jitter(0);
    sim.open().unwrap();
    for ch in [0, 1, 2] {
        sim.set_enabled(ch, true).unwrap();
    }
    sim.read_batch(true).unwrap();
    std::thread::sleep(Duration::from_millis(20));

    let batch = sim.read_batch(false).unwrap();
    let start = batch.tags.iter().find(|t| t.channel == 0).unwrap().time;
    let stop_a = batch.tags.iter().find(|t| t.channel == 1).unwrap().time;
    let stop_b = batch.tags.iter().find(|t| t.channel == 2).unwrap().time;
    assert_eq!(stop_a - start, 100);
    assert_eq!(stop_b - start, 150);
}

#[test]
fn replay_reset_leaves_the_script_in_place() {
    let scripted = Batch {
        tags: vec![Tag { time: 7, channel: 2 }],
        data_lost: false,
    };
    let mut replay = ReplayTagger::new(vec![scripted]);
    replay.open().unwrap();

    let reset = replay.read_batch(true).unwrap();
    assert!(reset.tags.is_empty());
    let first = replay.read_batch(false).unwrap();
    assert_eq!(first.tags.len(), 1);
    assert_eq!(first.tags[0].channel, 2);
    // Exhausted scripts read as an idle device
    let idle = replay.read_batch(false).unwrap();
    assert!(idle.tags.is_empty());
}

#[test]
fn replay_faults_pop_in_script_order() {
    let mut replay = ReplayTagger::scripted(vec![
        Err(DeviceError::Read("usb stall".into())),
        Ok(Batch::default()),
    ]);
    replay.open().unwrap();
    assert!(matches!(
        replay.read_batch(false),
        Err(DeviceError::Read(_))
    ));
    assert!(replay.read_batch(false).is_ok());
}

#[test]
fn reads_require_an_open_device() {
    let mut replay = ReplayTagger::new(Vec::new());
    assert!(matches!(replay.read_batch(false), Err(DeviceError::Closed)));
    replay.open().unwrap();
    assert!(replay.read_batch(false).is_ok());
    replay.close();
    assert!(matches!(replay.read_batch(false), Err(DeviceError::Closed)));
}
