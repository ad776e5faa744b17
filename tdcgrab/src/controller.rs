//! Acquisition session lifecycle: one device, one thread, one consumer

use flume::RecvTimeoutError;
use std::thread;
use tdctools::cfg::{ChannelRole, GrabConfig};
use tracing::{debug, info, warn};

use crate::device::Tagger;
use crate::dispatch::{Consumer, Diagnostic, Dispatch, Update};
use crate::error::{DeviceError, GrabError};
use crate::router::Router;

/// Owns the acquisition thread of a running session
pub struct GrabHandle {
    stop: flume::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Validate the configuration, open and condition the device, and hand
/// it to a fresh acquisition thread. Configuration and device failures
/// all surface here, before any thread exists.
pub fn start<T, C>(mut tagger: T, config: GrabConfig, consumer: C) -> Result<GrabHandle, GrabError>
where
    T: Tagger + 'static,
    C: Consumer + 'static,
{
    config.validate()?;
    tagger.open()?;
    if let Err(e) = condition_inputs(&mut tagger, &config) {
        tagger.close();
        return Err(GrabError::Device(e));
    }
    let router = Router::new(&config);
    let dispatch = Dispatch::new(Box::new(consumer));
    let (stop, stop_rx) = flume::bounded(1);
    let thread = thread::spawn(move || run(tagger, config, router, dispatch, stop_rx));
    Ok(GrabHandle {
        stop,
        thread: Some(thread),
    })
}

/// Push per-channel conditioning to the device and enable every channel
/// holding an active role. Fields left empty keep the device's values.
pub fn condition_inputs<T: Tagger>(
    tagger: &mut T,
    config: &GrabConfig,
) -> Result<(), DeviceError> {
    for c in &config.channels {
        if c.conditioning.is_some() || c.edge.is_some() || c.threshold.is_some() {
            let current = tagger.line_state(c.channel)?;
            tagger.set_conditioning(
                c.channel,
                c.conditioning.unwrap_or(current.conditioning),
                c.edge.unwrap_or(current.edge),
                c.threshold.unwrap_or(current.threshold),
            )?;
        }
        tagger.set_enabled(c.channel, c.role != ChannelRole::Disabled)?;
    }
    Ok(())
}

fn run<T: Tagger>(
    mut tagger: T,
    config: GrabConfig,
    mut router: Router,
    mut dispatch: Dispatch,
    stop: flume::Receiver<()>,
) {
    info!("acquisition started: {}", config.description);
    // Drop whatever the device buffered before this session
    if let Err(e) = tagger.read_batch(true) {
        warn!("backlog reset failed: {}", e);
    }
    loop {
        match tagger.read_batch(false) {
            Ok(batch) => {
                if batch.data_lost {
                    warn!("device dropped events before this batch");
                    dispatch.push(Update::Diagnostic(Diagnostic::DataLost));
                }
                for tag in batch.tags {
                    router.push(tag);
                }
            }
            Err(e) => warn!("batch read failed: {}", e),
        }
        if router.window_elapsed() >= config.update_interval {
            debug!("update interval elapsed, publishing");
            router.publish_window(&mut dispatch);
        }
        match stop.recv_timeout(config.poll_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tagger.close();
    info!("acquisition stopped");
}

impl GrabHandle {
    /// Stop the loop and wait for it to wind down. No consumer callback
    /// runs after this returns. Calling it again is a no-op. A panic on
    /// the acquisition thread resurfaces here.
    pub fn stop(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            if let Err(panic) = thread.join() {
                std::panic::resume_unwind(panic);
            }
        }
    }
}

/// Dropping the handle stops acquisition without resurfacing panics
impl Drop for GrabHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
