//! Configuration tools: channel roles and acquisition settings

use serde::{Serialize, Deserialize};
use std::time::Duration;
use thiserror::Error;

use crate::{CHAN9, TSTEP, WINDOW_DEFAULT};

/// What the event router does with tags on a channel
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    /// Ignore events entirely
    Disabled,
    /// Count events toward the channel rate
    Rate,
    /// Buffer events for raw tag readout
    Tags,
    /// Open a pairing session
    Start,
    /// Fill one of the two stop slots of the open session
    Stop,
    /// Mark the open session as gated (gated mode only)
    Gate,
}

/// Whether a pairing session completes on its two stops alone, or only
/// once a gate event has arrived in the same acceptance window
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    Standalone,
    Gated,
}

/// Input stage termination and level standard
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Conditioning {
    Lvttl,
    Nim,
    Misc,
}

/// Which signal edge the input discriminator triggers on
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEdge {
    Rising,
    Falling,
}

/// Role and input conditioning for one channel. Conditioning fields left
/// empty keep whatever the device already has set.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    pub channel:      u8,
    pub role:         ChannelRole,
    pub conditioning: Option<Conditioning>,
    pub edge:         Option<TriggerEdge>,
    pub threshold:    Option<f64>,
}

/// Full setup of one acquisition session. A session runs with a fixed
/// configuration; to change anything here, stop and start again.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GrabConfig {
    pub description:     String,
    pub mode:            PairingMode,
    /// Cadence for publishing rates, histograms, and raw tags
    #[serde(with = "humantime_serde")]
    pub update_interval: Duration,
    /// How long the acquisition loop waits between device reads
    #[serde(with = "humantime_serde")]
    pub poll_interval:   Duration,
    /// Pairing acceptance window in ticks
    pub window:          i64,
    /// Bins per published histogram
    pub bins:            usize,
    /// First and last bin centers of a fixed histogram range. Left empty,
    /// each window derives its range from the samples it saw.
    pub range:           Option<(f64, f64)>,
    /// Also publish the histogram of stop B minus stop A
    pub difference:      bool,
    /// Drop any event arriving on the same channel as the one before it
    pub alternate_only:  bool,
    /// Duration of one device tick in seconds
    pub tick:            f64,
    #[serde(default = "emptyvec", skip_serializing_if = "Vec::is_empty")]
    pub channels:        Vec<ChannelConfig>,
}

/// The channels of a validated pairing setup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairingLines {
    pub start: u8,
    pub stops: (u8, u8),
    pub gate:  Option<u8>,
}

/// A configuration rejected before any acquisition starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("channel {0} is not an input of this device")]
    UnknownChannel(u8),
    #[error("channel {0} is configured more than once")]
    DuplicateChannel(u8),
    #[error("channel {0} is a second start input")]
    ExtraStart(u8),
    #[error("pairing configured with no start input")]
    NoStart,
    #[error("pairing takes exactly two stop inputs, got {0}")]
    StopCount(usize),
    #[error("gate inputs do not match the pairing mode, got {0}")]
    GateCount(usize),
    #[error("update and poll intervals must be nonzero")]
    ZeroInterval,
    #[error("acceptance window must be positive, got {0}")]
    BadWindow(i64),
    #[error("histograms take at least one bin")]
    NoBins,
    #[error("tick duration must be positive, got {0}")]
    BadTick(f64),
    #[error("histogram range must satisfy low < high, got ({0}, {1})")]
    BadRange(f64, f64),
}

impl GrabConfig {
    /// Channels holding the given role, in declaration order
    pub fn channels_with(&self, role: ChannelRole) -> Vec<u8> {
        self.channels
            .iter()
            .filter(|c| c.role == role)
            .map(|c| c.channel)
            .collect()
    }

    /// The pairing channels, if this configuration sets up pairing at all.
    /// Only meaningful once [`validate`](Self::validate) has passed.
    pub fn pairing(&self) -> Option<PairingLines> {
        let starts = self.channels_with(ChannelRole::Start);
        let stops = self.channels_with(ChannelRole::Stop);
        let gates = self.channels_with(ChannelRole::Gate);
        match (starts.as_slice(), stops.as_slice()) {
            (&[start], &[a, b]) => Some(PairingLines {
                start,
                stops: (a, b),
                gate: match self.mode {
                    PairingMode::Gated => gates.first().copied(),
                    PairingMode::Standalone => None,
                },
            }),
            _ => None,
        }
    }

    /// Check the whole configuration for consistency. Everything here is
    /// caught before a device is touched or a thread spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, c) in self.channels.iter().enumerate() {
            if !CHAN9.contains(&c.channel) {
                return Err(ConfigError::UnknownChannel(c.channel));
            }
            if self.channels[..i].iter().any(|o| o.channel == c.channel) {
                return Err(ConfigError::DuplicateChannel(c.channel));
            }
        }
        if self.update_interval.is_zero() || self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.window <= 0 {
            return Err(ConfigError::BadWindow(self.window));
        }
        if self.bins == 0 {
            return Err(ConfigError::NoBins);
        }
        if self.tick <= 0.0 {
            return Err(ConfigError::BadTick(self.tick));
        }
        if let Some((lo, hi)) = self.range {
            if !(lo < hi) {
                return Err(ConfigError::BadRange(lo, hi));
            }
        }
        let starts = self.channels_with(ChannelRole::Start);
        let stops = self.channels_with(ChannelRole::Stop);
        let gates = self.channels_with(ChannelRole::Gate);
        if starts.len() > 1 {
            return Err(ConfigError::ExtraStart(starts[1]));
        }
        if starts.is_empty() && stops.is_empty() && gates.is_empty() {
            // No pairing at all: rates and raw tags only
            return Ok(());
        }
        if starts.is_empty() {
            return Err(ConfigError::NoStart);
        }
        if stops.len() != 2 {
            return Err(ConfigError::StopCount(stops.len()));
        }
        match self.mode {
            PairingMode::Standalone if !gates.is_empty() => {
                Err(ConfigError::GateCount(gates.len()))
            }
            PairingMode::Gated if gates.len() != 1 => Err(ConfigError::GateCount(gates.len())),
            _ => Ok(()),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            channel:      0,
            role:         ChannelRole::Disabled,
            conditioning: None,
            edge:         None,
            threshold:    None,
        }
    }
}

/// One-second updates, standalone pairing, and no channels assigned
impl Default for GrabConfig {
    fn default() -> Self {
        GrabConfig {
            description:     String::new(),
            mode:            PairingMode::Standalone,
            update_interval: Duration::from_secs(1),
            poll_interval:   Duration::from_millis(10),
            window:          WINDOW_DEFAULT,
            bins:            20,
            range:           None,
            difference:      true,
            alternate_only:  false,
            tick:            TSTEP,
            channels:        Vec::new(),
        }
    }
}

fn emptyvec<T>() -> Vec<T> {
    Vec::new()
}
