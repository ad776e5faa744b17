//! Device adapter boundary and hardware-free tag sources

use rand::prelude::*;
use std::collections::VecDeque;
use std::time::Instant;
use tdctools::cfg::{Conditioning, TriggerEdge};
use tdctools::{Tag, CHAN9, TSTEP};

use crate::error::DeviceError;

/// One drain of the device buffer: tags in arrival order, plus whether
/// the device lost events since the previous read
#[derive(Clone, Debug, Default)]
pub struct Batch {
    pub tags: Vec<Tag>,
    pub data_lost: bool,
}

/// Conditioning state of one input line as the device reports it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineState {
    pub enabled: bool,
    pub conditioning: Conditioning,
    pub edge: TriggerEdge,
    pub threshold: f64,
}

impl Default for LineState {
    fn default() -> Self {
        LineState {
            enabled: false,
            conditioning: Conditioning::Misc,
            edge: TriggerEdge::Rising,
            threshold: 1.0,
        }
    }
}

/// Boundary to the time tagger hardware.
///
/// Tags come out in time order within and across batches. `read_batch`
/// may wait briefly for the device but never blocks indefinitely.
pub trait Tagger: Send {
    /// Connect to the device and arm it
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Drain buffered tags. With `reset` the backlog is discarded
    /// instead of returned, leaving the device fresh for a session.
    fn read_batch(&mut self, reset: bool) -> Result<Batch, DeviceError>;

    /// Conditioning and enablement of one input line
    fn line_state(&self, channel: u8) -> Result<LineState, DeviceError>;

    /// Set termination, trigger edge, and threshold of one input line
    fn set_conditioning(
        &mut self,
        channel: u8,
        conditioning: Conditioning,
        edge: TriggerEdge,
        threshold: f64,
    ) -> Result<(), DeviceError>;

    /// Allow or suppress events on one input line
    fn set_enabled(&mut self, channel: u8, enabled: bool) -> Result<(), DeviceError>;

    /// Disarm and disconnect. Further reads are an error.
    fn close(&mut self);
}

/// Ticks between a simulated start tag and its gate tag
const GATE_DELAY: i64 = 10;

/// Synthetic tagger: a periodic start on line 0, jittered stops on lines
/// 1 and 2, a gate on line 3, and uniform background singles on line 4.
/// Batch sizes follow the wall clock, so measured rates come out near
/// their nominal settings. Disabled lines emit nothing.
pub struct SimTagger {
    rng: StdRng,
    open: bool,
    lines: [LineState; CHAN9.len()],
    clock: i64,
    last_read: Option<Instant>,
    session_carry: f64,
    singles_carry: f64,
    start_period: f64,
    delay_a: i64,
    delay_b: i64,
    jitter: i64,
    singles_rate: f64,
}

impl SimTagger {
    /// Deterministic for a given seed, up to wall-clock batch sizing
    pub fn new(seed: u64) -> SimTagger {
        SimTagger {
            rng: StdRng::seed_from_u64(seed),
            open: false,
            lines: [LineState::default(); CHAN9.len()],
            clock: 0,
            last_read: None,
            session_carry: 0.0,
            singles_carry: 0.0,
            start_period: 1e-3,
            delay_a: 100,
            delay_b: 150,
            jitter: 40,
            singles_rate: 2_000.0,
        }
    }

    /// Start events per second
    pub fn start_rate(mut self, hz: f64) -> SimTagger {
        self.start_period = hz.recip();
        self
    }

    /// Nominal stop delays in ticks from each start
    pub fn delays(mut self, stop_a: i64, stop_b: i64) -> SimTagger {
        self.delay_a = stop_a;
        self.delay_b = stop_b;
        self
    }

    /// Half-width of the uniform jitter on each stop delay, in ticks
    pub fn jitter(mut self, ticks: i64) -> SimTagger {
        self.jitter = ticks;
        self
    }

    /// Background events per second on the singles line
    pub fn singles_rate(mut self, hz: f64) -> SimTagger {
        self.singles_rate = hz;
        self
    }

    fn jittered(&mut self, delay: i64) -> i64 {
        if self.jitter == 0 {
            return delay;
        }
        delay + self.rng.gen_range(-self.jitter..=self.jitter)
    }
}

impl Tagger for SimTagger {
    fn open(&mut self) -> Result<(), DeviceError> {
        self.open = true;
        self.clock = 0;
        self.last_read = None;
        Ok(())
    }

    fn read_batch(&mut self, reset: bool) -> Result<Batch, DeviceError> {
        if !self.open {
            return Err(DeviceError::Closed);
        }
        let now = Instant::now();
        let elapsed = match self.last_read.replace(now) {
            Some(last) => now.duration_since(last).as_secs_f64(),
            None => 0.0,
        };
        if reset {
            self.session_carry = 0.0;
            self.singles_carry = 0.0;
            return Ok(Batch::default());
        }
        let due = elapsed / self.start_period + self.session_carry;
        let sessions = due.floor();
        self.session_carry = due - sessions;
        let period_ticks = (self.start_period / TSTEP) as i64;
        let mut tags = Vec::new();
        for _ in 0..sessions as u64 {
            self.clock += period_ticks;
            let start = self.clock;
            let mut block = Vec::new();
            if self.lines[0].enabled {
                block.push(Tag { time: start, channel: 0 });
            }
            if self.lines[3].enabled {
                block.push(Tag { time: start + GATE_DELAY, channel: 3 });
            }
            if self.lines[1].enabled {
                let delay = self.jittered(self.delay_a);
                block.push(Tag { time: start + delay, channel: 1 });
            }
            if self.lines[2].enabled {
                let delay = self.jittered(self.delay_b);
                block.push(Tag { time: start + delay, channel: 2 });
            }
            if self.lines[4].enabled {
                self.singles_carry += self.singles_rate * self.start_period;
                while self.singles_carry >= 1.0 {
                    self.singles_carry -= 1.0;
                    let offset = self.rng.gen_range(1..period_ticks);
                    block.push(Tag { time: start + offset, channel: 4 });
                }
            }
            block.sort();
            tags.extend(block);
        }
        Ok(Batch { tags, data_lost: false })
    }

    fn line_state(&self, channel: u8) -> Result<LineState, DeviceError> {
        get_line(&self.lines, channel)
    }

    fn set_conditioning(
        &mut self,
        channel: u8,
        conditioning: Conditioning,
        edge: TriggerEdge,
        threshold: f64,
    ) -> Result<(), DeviceError> {
        let line = get_line_mut(&mut self.lines, channel)?;
        line.conditioning = conditioning;
        line.edge = edge;
        line.threshold = threshold;
        Ok(())
    }

    fn set_enabled(&mut self, channel: u8, enabled: bool) -> Result<(), DeviceError> {
        get_line_mut(&mut self.lines, channel)?.enabled = enabled;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Plays back a scripted sequence of read outcomes. Once the script is
/// exhausted, reads come back empty, as from an idle device.
pub struct ReplayTagger {
    script: VecDeque<Result<Batch, DeviceError>>,
    refuse_open: bool,
    open: bool,
    lines: [LineState; CHAN9.len()],
}

impl ReplayTagger {
    pub fn new(batches: Vec<Batch>) -> ReplayTagger {
        ReplayTagger::scripted(batches.into_iter().map(Ok).collect())
    }

    /// Script read outcomes directly, including device faults
    pub fn scripted(script: Vec<Result<Batch, DeviceError>>) -> ReplayTagger {
        ReplayTagger {
            script: script.into(),
            refuse_open: false,
            open: false,
            lines: [LineState::default(); CHAN9.len()],
        }
    }

    /// A tagger with no hardware behind it: open always fails
    pub fn offline() -> ReplayTagger {
        let mut t = ReplayTagger::new(Vec::new());
        t.refuse_open = true;
        t
    }
}

impl Tagger for ReplayTagger {
    fn open(&mut self) -> Result<(), DeviceError> {
        if self.refuse_open {
            return Err(DeviceError::Connect("no tagger found".into()));
        }
        self.open = true;
        Ok(())
    }

    fn read_batch(&mut self, reset: bool) -> Result<Batch, DeviceError> {
        if !self.open {
            return Err(DeviceError::Closed);
        }
        if reset {
            // The script models data arriving after the backlog reset
            return Ok(Batch::default());
        }
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(Batch::default()))
    }

    fn line_state(&self, channel: u8) -> Result<LineState, DeviceError> {
        get_line(&self.lines, channel)
    }

    fn set_conditioning(
        &mut self,
        channel: u8,
        conditioning: Conditioning,
        edge: TriggerEdge,
        threshold: f64,
    ) -> Result<(), DeviceError> {
        let line = get_line_mut(&mut self.lines, channel)?;
        line.conditioning = conditioning;
        line.edge = edge;
        line.threshold = threshold;
        Ok(())
    }

    fn set_enabled(&mut self, channel: u8, enabled: bool) -> Result<(), DeviceError> {
        get_line_mut(&mut self.lines, channel)?.enabled = enabled;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

fn get_line(lines: &[LineState; CHAN9.len()], channel: u8) -> Result<LineState, DeviceError> {
    match lines.get(channel as usize) {
        Some(&line) => Ok(line),
        None => Err(DeviceError::BadChannel(channel)),
    }
}

fn get_line_mut(
    lines: &mut [LineState; CHAN9.len()],
    channel: u8,
) -> Result<&mut LineState, DeviceError> {
    match lines.get_mut(channel as usize) {
        Some(line) => Ok(line),
        None => Err(DeviceError::BadChannel(channel)),
    }
}
