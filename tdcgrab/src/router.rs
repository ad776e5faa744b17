//! Per-event routing into rates, raw tag buffers, and pairing histograms

use std::mem;
use std::time::Duration;
use tdctools::cfg::{ChannelRole, GrabConfig};
use tdctools::hist::Histogram;
use tdctools::pairing::Pairing;
use tdctools::{Tag, CHAN9};
use tracing::debug;

use crate::dispatch::{Dispatch, HistogramUpdate, RateUpdate, RawTagsUpdate, Update};
use crate::rates::RateEstimator;

struct PairingBlock {
    machine: Pairing,
    stops: (u8, u8),
    hist_a: Histogram,
    hist_b: Histogram,
    hist_diff: Option<Histogram>,
}

/// Sorts each event to its configured consumer and collects everything
/// one publishing window accumulates.
///
/// A fresh router starts every session, so nothing carries over from the
/// run before. Pairing sessions straddle publishing windows untouched;
/// only the collected output resets per window.
pub struct Router {
    roles: [ChannelRole; CHAN9.len()],
    alternate_only: bool,
    last_channel: Option<u8>,
    rates: RateEstimator,
    block: Option<PairingBlock>,
    tag_channels: Vec<u8>,
    tag_buffers: Vec<Vec<Tag>>,
    bins: usize,
    range: Option<(f64, f64)>,
}

impl Router {
    /// Wire up a validated configuration
    pub fn new(config: &GrabConfig) -> Router {
        let mut roles = [ChannelRole::Disabled; CHAN9.len()];
        for c in &config.channels {
            if let Some(slot) = roles.get_mut(c.channel as usize) {
                *slot = c.role;
            }
        }
        let tag_channels = config.channels_with(ChannelRole::Tags);
        let tag_buffers = vec![Vec::new(); tag_channels.len()];
        let rates = RateEstimator::new(config.channels_with(ChannelRole::Rate));
        let block = config.pairing().map(|lines| PairingBlock {
            machine: Pairing::new(lines.start, lines.stops, lines.gate, config.window),
            stops: lines.stops,
            hist_a: fresh(config.bins, config.range),
            hist_b: fresh(config.bins, config.range),
            hist_diff: config.difference.then(|| fresh(config.bins, config.range)),
        });
        Router {
            roles,
            alternate_only: config.alternate_only,
            last_channel: None,
            rates,
            block,
            tag_channels,
            tag_buffers,
            bins: config.bins,
            range: config.range,
        }
    }

    /// Route one tag, in stream order
    pub fn push(&mut self, tag: Tag) {
        if self.alternate_only && self.last_channel == Some(tag.channel) {
            return;
        }
        self.last_channel = Some(tag.channel);
        let role = match self.roles.get(tag.channel as usize) {
            Some(&role) => role,
            None => {
                debug!("tag on channel {}, not an input of this device", tag.channel);
                return;
            }
        };
        match role {
            ChannelRole::Disabled => {}
            ChannelRole::Rate => self.rates.record(tag.channel),
            ChannelRole::Tags => {
                if let Some(i) = self.tag_channels.iter().position(|&c| c == tag.channel) {
                    self.tag_buffers[i].push(tag);
                }
            }
            ChannelRole::Start | ChannelRole::Stop | ChannelRole::Gate => {
                if let Some(block) = &mut self.block {
                    if let Some(pair) = block.machine.push(tag) {
                        block.hist_a.add(pair.stop_a as f64);
                        block.hist_b.add(pair.stop_b as f64);
                        if let Some(h) = &mut block.hist_diff {
                            h.add(pair.difference() as f64);
                        }
                    }
                }
            }
        }
    }

    /// Time since the current publishing window opened
    pub fn window_elapsed(&self) -> Duration {
        self.rates.elapsed()
    }

    /// Close the window: push one update per configured collection, then
    /// start collecting fresh for the next window.
    pub fn publish_window(&mut self, dispatch: &mut Dispatch) {
        if let Some((rates, elapsed)) = self.rates.snapshot() {
            if !rates.is_empty() {
                let (channels, per_second) = rates.into_iter().unzip();
                dispatch.push(Update::Rates(RateUpdate {
                    channels,
                    rates: per_second,
                    elapsed,
                }));
            }
        }
        let (bins, range) = (self.bins, self.range);
        if let Some(block) = &mut self.block {
            let mut histograms = vec![
                mem::replace(&mut block.hist_a, fresh(bins, range)),
                mem::replace(&mut block.hist_b, fresh(bins, range)),
            ];
            let mut labels = vec![
                format!("channel {}", block.stops.0),
                format!("channel {}", block.stops.1),
            ];
            if let Some(h) = &mut block.hist_diff {
                histograms.push(mem::replace(h, fresh(bins, range)));
                labels.push(String::from("difference"));
            }
            for h in &mut histograms {
                h.finalize();
            }
            dispatch.push(Update::Histograms(HistogramUpdate {
                labels,
                histograms,
                dropped_sessions: block.machine.dropped(),
            }));
        }
        if !self.tag_channels.is_empty() {
            let tags = self.tag_buffers.iter_mut().map(mem::take).collect();
            dispatch.push(Update::RawTags(RawTagsUpdate {
                channels: self.tag_channels.clone(),
                tags,
            }));
        }
    }
}

fn fresh(bins: usize, range: Option<(f64, f64)>) -> Histogram {
    match range {
        Some((lo, hi)) => Histogram::fixed(bins, lo, hi),
        None => Histogram::deferred(bins),
    }
}
