pub mod cfg;
pub mod hist;
pub mod pairing;

/// The basic representation of a tagged event
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct Tag {
    /// Counter in device ticks from arbitrary offset
    pub time: i64,
    /// Input line of the event (0 is the start input)
    pub channel: u8,
}

/// Duration of one device tick, in seconds
pub const TSTEP: f64 = 1e-12;

/// All input lines: the start input plus eight stop inputs
pub const CHAN9: [u8; 9] = [0, 1, 2, 3, 4, 5, 6, 7, 8];

/// Default pairing acceptance window, in ticks
pub const WINDOW_DEFAULT: i64 = 1000;
