#![allow(dead_code)]

use rand::prelude::*;
use tdctools::Tag;

/// A start/stop/stop stream with jittered delays, in time order
pub fn synthetic_stream(sessions: usize) -> Vec<Tag> {
    let mut rng = StdRng::seed_from_u64(17);
    let mut tags = Vec::with_capacity(sessions * 3);
    let mut t: i64 = 0;
    for _ in 0..sessions {
        t += 1_000_000;
        tags.push(Tag { time: t, channel: 0 });
        let a = t + 100 + rng.gen_range(-40..=40);
        let b = t + 150 + rng.gen_range(-40..=40);
        let mut stops = [
            Tag { time: a, channel: 1 },
            Tag { time: b, channel: 2 },
        ];
        stops.sort();
        tags.extend(stops);
    }
    tags
}

pub fn synthetic_samples(n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(23);
    (0..n).map(|_| rng.gen_range(-500.0..500.0)).collect()
}
