//! Handoff of completed windows to the registered consumer

use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tdctools::hist::Histogram;
use tdctools::Tag;

/// One completed rate window
#[derive(Clone, Debug, PartialEq)]
pub struct RateUpdate {
    pub channels: Vec<u8>,
    /// Events per second, aligned with `channels`
    pub rates: Vec<f64>,
    /// Measured length of the window the rates were averaged over
    pub elapsed: Duration,
}

/// Pairing histograms of one completed window. Ranges and statistics are
/// already finalized; `dropped_sessions` counts sessions superseded by a
/// fresh start since acquisition began.
#[derive(Clone, Debug)]
pub struct HistogramUpdate {
    pub labels: Vec<String>,
    pub histograms: Vec<Histogram>,
    pub dropped_sessions: u64,
}

/// Raw tags buffered on the tag-role channels during one window
#[derive(Clone, Debug, PartialEq)]
pub struct RawTagsUpdate {
    pub channels: Vec<u8>,
    /// One buffer per entry of `channels`, in stream order
    pub tags: Vec<Vec<Tag>>,
}

impl RateUpdate {
    pub fn labels(&self) -> Vec<String> {
        channel_labels(&self.channels)
    }
}

impl RawTagsUpdate {
    pub fn labels(&self) -> Vec<String> {
        channel_labels(&self.channels)
    }
}

/// Non-fatal conditions reported alongside the data stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// The device overflowed and lost events before a batch
    DataLost,
}

/// Everything the acquisition loop can hand to its consumer
#[derive(Clone, Debug)]
pub enum Update {
    Rates(RateUpdate),
    Histograms(HistogramUpdate),
    RawTags(RawTagsUpdate),
    Diagnostic(Diagnostic),
}

/// Receives every update, on the acquisition thread. At most one call is
/// in flight at a time; take what you need and return quickly, since a
/// slow consumer stalls the polling loop.
pub trait Consumer: Send {
    fn handle(&mut self, update: Update);
}

/// Forward updates into a channel. A send failure means the receiver is
/// gone and the update is quietly discarded.
impl Consumer for flume::Sender<Update> {
    fn handle(&mut self, update: Update) {
        let _ = self.send(update);
    }
}

/// Adapt a closure into a [`Consumer`]
pub struct Callback<F>(pub F);

impl<F> Consumer for Callback<F>
where
    F: FnMut(Update) + Send,
{
    fn handle(&mut self, update: Update) {
        (self.0)(update)
    }
}

/// The single registered consumer of one acquisition session
pub struct Dispatch {
    consumer: Box<dyn Consumer>,
}

impl Dispatch {
    pub fn new(consumer: Box<dyn Consumer>) -> Dispatch {
        Dispatch { consumer }
    }

    pub(crate) fn push(&mut self, update: Update) {
        self.consumer.handle(update);
    }
}

#[derive(Default)]
struct Slots {
    rates: Option<RateUpdate>,
    histograms: Option<HistogramUpdate>,
    raw_tags: Option<RawTagsUpdate>,
    data_lost: u64,
}

/// Latest-only mailbox: a [`Consumer`] holding one slot per update kind,
/// each overwritten as new windows land. A reader polling slower than
/// the update cadence sees the freshest window and skips the rest, and
/// the acquisition thread never waits on the reader.
///
/// Clone it, register one clone as the consumer, and read from the other.
#[derive(Clone, Default)]
pub struct Latest {
    inner: Arc<Mutex<Slots>>,
}

impl Latest {
    pub fn new() -> Latest {
        Latest::default()
    }

    /// The newest unread rate window, emptying the slot
    pub fn take_rates(&self) -> Option<RateUpdate> {
        self.inner.lock().rates.take()
    }

    /// The newest unread histogram window, emptying the slot
    pub fn take_histograms(&self) -> Option<HistogramUpdate> {
        self.inner.lock().histograms.take()
    }

    /// The newest unread raw tag window, emptying the slot
    pub fn take_raw_tags(&self) -> Option<RawTagsUpdate> {
        self.inner.lock().raw_tags.take()
    }

    /// Data-lost reports since the last call
    pub fn take_data_lost(&self) -> u64 {
        mem::take(&mut self.inner.lock().data_lost)
    }
}

impl Consumer for Latest {
    fn handle(&mut self, update: Update) {
        let mut slots = self.inner.lock();
        match update {
            Update::Rates(u) => slots.rates = Some(u),
            Update::Histograms(u) => slots.histograms = Some(u),
            Update::RawTags(u) => slots.raw_tags = Some(u),
            Update::Diagnostic(Diagnostic::DataLost) => slots.data_lost += 1,
        }
    }
}

fn channel_labels(channels: &[u8]) -> Vec<String> {
    channels.iter().map(|c| format!("channel {}", c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_slot_keeps_the_newest_update() {
        let latest = Latest::new();
        let mut consumer = latest.clone();
        for n in [1.0, 2.0] {
            consumer.handle(Update::Rates(RateUpdate {
                channels: vec![3],
                rates: vec![n],
                elapsed: Duration::from_secs(1),
            }));
        }
        let u = latest.take_rates().unwrap();
        assert_eq!(u.labels(), vec!["channel 3"]);
        assert_eq!(u.rates, vec![2.0]);
        assert!(latest.take_rates().is_none());
    }

    #[test]
    fn data_lost_reports_accumulate() {
        let latest = Latest::new();
        let mut consumer = latest.clone();
        consumer.handle(Update::Diagnostic(Diagnostic::DataLost));
        consumer.handle(Update::Diagnostic(Diagnostic::DataLost));
        assert_eq!(latest.take_data_lost(), 2);
        assert_eq!(latest.take_data_lost(), 0);
    }
}
