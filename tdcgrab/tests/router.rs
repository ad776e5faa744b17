use std::time::Duration;

use tdcgrab::dispatch::{Dispatch, Update};
use tdcgrab::router::Router;
use tdctools::cfg::{ChannelConfig, ChannelRole, GrabConfig, PairingMode};
use tdctools::Tag;

fn tag(time: i64, channel: u8) -> Tag {
    Tag { time, channel }
}

fn pairing_channels() -> Vec<ChannelConfig> {
    let channels = vec![
        ChannelConfig {
            channel: 0,
            role: ChannelRole::Start,
            ..Default::default()
        },
        ChannelConfig {
            channel: 1,
            role: ChannelRole::Stop,
            ..Default::default()
        },
        ChannelConfig {
            channel: 2,
            role: ChannelRole::Stop,
            ..Default::default()
        },
    ];
    return channels;
}

/// Close the window through a channel-backed dispatcher and collect
/// whatever came out
fn publish(router: &mut Router) -> Vec<Update> {
    let (tx, rx) = flume::unbounded();
    let mut dispatch = Dispatch::new(Box::new(tx));
    router.publish_window(&mut dispatch);
    let updates = rx.try_iter().collect();
    return updates;
}

#[test]
fn alternate_only_suppresses_repeated_channels() {
    let config = GrabConfig {
        alternate_only: true,
        channels: vec![
            ChannelConfig {
                channel: 3,
                role: ChannelRole::Tags,
                ..Default::default()
            },
            ChannelConfig {
                channel: 5,
                role: ChannelRole::Rate,
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let mut router = Router::new(&config);
    for t in [
        tag(0, 3),
        tag(10, 3), // repeat, suppressed
        tag(20, 5),
        tag(30, 3),
        tag(40, 5),
        tag(50, 5), // repeat, suppressed
    ] {
        router.push(t);
    }
    std::thread::sleep(Duration::from_millis(5));

    let mut saw_tags = false;
    let mut saw_rates = false;
    for update in publish(&mut router) {
        match update {
            Update::RawTags(u) => {
                assert_eq!(u.channels, vec![3]);
                let times: Vec<i64> = u.tags[0].iter().map(|t| t.time).collect();
                assert_eq!(times, vec![0, 30]);
                saw_tags = true;
            }
            Update::Rates(u) => {
                let count = u.rates[0] * u.elapsed.as_secs_f64();
                assert!((count - 2.0).abs() < 1e-6);
                saw_rates = true;
            }
            _ => {}
        }
    }
    assert!(saw_tags);
    assert!(saw_rates);
}

#[test]
fn disabled_and_unassigned_channels_are_ignored() {
    let config = GrabConfig {
        channels: vec![
            ChannelConfig {
                channel: 2,
                role: ChannelRole::Tags,
                ..Default::default()
            },
            ChannelConfig {
                channel: 7,
                role: ChannelRole::Disabled,
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let mut router = Router::new(&config);
    router.push(tag(0, 2));
    router.push(tag(10, 7));
    router.push(tag(20, 8));
    // Channels past what the device has are dropped without fuss
    router.push(tag(30, 12));
    router.push(tag(40, 2));

    let updates = publish(&mut router);
    // No rate channels configured, so only the raw tag window comes out
    assert_eq!(updates.len(), 1);
    match &updates[0] {
        Update::RawTags(u) => {
            assert_eq!(u.channels, vec![2]);
            assert_eq!(u.tags[0].len(), 2);
        }
        other => panic!("expected raw tags, got {:?}", other),
    }
}

#[test]
fn pairing_fills_all_three_histograms() {
    let config = GrabConfig {
        channels: pairing_channels(),
        ..Default::default()
    };
    let mut router = Router::new(&config);
    for t in [tag(0, 0), tag(100, 1), tag(150, 2)] {
        router.push(t);
    }

    let mut saw_histograms = false;
    for update in publish(&mut router) {
        if let Update::Histograms(mut u) = update {
            assert_eq!(u.labels, vec!["channel 1", "channel 2", "difference"]);
            assert_eq!(u.histograms[0].sample_count(), 1.0);
            assert_eq!(u.histograms[1].sample_count(), 1.0);
            assert_eq!(u.histograms[2].sample_count(), 1.0);
            assert_eq!(u.dropped_sessions, 0);
            saw_histograms = true;
        }
    }
    assert!(saw_histograms);
}

#[test]
fn difference_histogram_can_be_disabled() {
    let config = GrabConfig {
        difference: false,
        channels: pairing_channels(),
        ..Default::default()
    };
    let mut router = Router::new(&config);
    for t in [tag(0, 0), tag(100, 1), tag(150, 2)] {
        router.push(t);
    }

    for update in publish(&mut router) {
        if let Update::Histograms(u) = update {
            assert_eq!(u.labels, vec!["channel 1", "channel 2"]);
            assert_eq!(u.histograms.len(), 2);
        }
    }
}

#[test]
fn fixed_range_histograms_keep_their_span() {
    let config = GrabConfig {
        range: Some((0.0, 400.0)),
        bins: 5,
        difference: false,
        channels: pairing_channels(),
        ..Default::default()
    };
    let mut router = Router::new(&config);
    for t in [tag(0, 0), tag(100, 1), tag(150, 2)] {
        router.push(t);
    }

    for update in publish(&mut router) {
        if let Update::Histograms(mut u) = update {
            assert_eq!(u.histograms[0].range(), Some((0.0, 400.0)));
            assert_eq!(u.histograms[0].sample_count(), 1.0);
            assert_eq!(u.histograms[0].bins(), &[0.0, 1.0, 0.0, 0.0, 0.0]);
        }
    }

    // The next window starts empty on the same span
    for update in publish(&mut router) {
        if let Update::Histograms(mut u) = update {
            assert_eq!(u.histograms[0].range(), Some((0.0, 400.0)));
            assert_eq!(u.histograms[0].sample_count(), 0.0);
        }
    }
}

#[test]
fn sessions_straddle_publishing_windows() {
    let config = GrabConfig {
        mode: PairingMode::Gated,
        channels: vec![
            ChannelConfig {
                channel: 0,
                role: ChannelRole::Start,
                ..Default::default()
            },
            ChannelConfig {
                channel: 1,
                role: ChannelRole::Stop,
                ..Default::default()
            },
            ChannelConfig {
                channel: 2,
                role: ChannelRole::Stop,
                ..Default::default()
            },
            ChannelConfig {
                channel: 3,
                role: ChannelRole::Gate,
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    let mut router = Router::new(&config);
    router.push(tag(0, 0));
    router.push(tag(5, 1));
    router.push(tag(8, 2));

    for update in publish(&mut router) {
        if let Update::Histograms(mut u) = update {
            // Still waiting on the gate
            assert_eq!(u.histograms[0].sample_count(), 0.0);
        }
    }

    // The gate lands in the next window and completes the session
    router.push(tag(9, 3));
    for update in publish(&mut router) {
        if let Update::Histograms(mut u) = update {
            assert_eq!(u.histograms[0].sample_count(), 1.0);
        }
    }
}

#[test]
fn dropped_sessions_accumulate_across_windows() {
    let config = GrabConfig {
        channels: pairing_channels(),
        ..Default::default()
    };
    let mut router = Router::new(&config);
    router.push(tag(0, 0));
    router.push(tag(5, 1));
    router.push(tag(2000, 0)); // drops the first session

    for update in publish(&mut router) {
        if let Update::Histograms(u) = update {
            assert_eq!(u.dropped_sessions, 1);
        }
    }

    router.push(tag(4000, 0)); // drops the second
    for update in publish(&mut router) {
        if let Update::Histograms(u) = update {
            assert_eq!(u.dropped_sessions, 2);
        }
    }
}
