//! # Capture Session Module
//!
//! A session owns everything a live pitch tracker needs between frames: the
//! frame source, the worker thread running the per-frame analysis, and the
//! channels connecting them. The estimator itself stays stateless; the
//! session calls it once per frame and forwards the reading.
//!
//! ## Architecture
//! - **Caller Thread**: starts and stops the session, drains readings
//! - **Worker Thread**: owns the frame source, analyses each frame
//! - **Communication**: crossbeam channels for frames, readings and shutdown

use crate::analysis::{self, Reading};
use anyhow::{Result, anyhow, bail};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};
use std::thread::{self, JoinHandle};

/// Number of frames that may queue up before the source starts dropping them.
pub const FRAME_QUEUE_CAPACITY: usize = 8;

/// Number of undrained readings kept before new ones are dropped.
pub const READING_QUEUE_CAPACITY: usize = 64;

/// Something that produces fixed-size audio frames, such as a microphone.
///
/// `start` runs on the session's worker thread, so handles that must not
/// cross threads (like a CPAL stream) never leave it.
pub trait FrameSource: Send + 'static {
    /// Keeps the source alive while the session runs.
    type Handle;

    /// Starts producing frames into `frames`.
    ///
    /// # Returns
    /// * `Ok((handle, sample_rate))` - The running source and its sample rate in Hz
    /// * `Err(e)` - The source could not be started
    fn start(self, frames: Sender<Vec<f32>>) -> Result<(Self::Handle, u32)>;

    /// Stops the source. Called on the worker thread after the frame
    /// receiver has been dropped.
    fn release(handle: Self::Handle) {
        drop(handle);
    }
}

/// Worker thread management structure.
#[derive(Debug)]
struct Worker {
    shutdown_tx: Sender<()>,
    thread_handle: JoinHandle<()>,
}

/// A running capture session.
///
/// Dropping the session stops it.
#[derive(Debug)]
pub struct Session {
    readings: Receiver<Reading>,
    sample_rate: u32,
    worker: Option<Worker>,
}

impl Session {
    /// Starts a session on a dedicated worker thread.
    ///
    /// Blocks until the source has either started or failed, so start-up
    /// errors are reported here rather than on the worker.
    pub fn start<S: FrameSource>(source: S) -> Result<Self> {
        let (reading_tx, reading_rx) = crossbeam_channel::bounded(READING_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let thread_handle = thread::Builder::new()
            .name("pitchtrack-worker".into())
            .spawn(move || run_worker(source, reading_tx, shutdown_rx, ready_tx))?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(sample_rate)) => sample_rate,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e.context("failed to start audio capture"));
            }
            Err(_) => {
                let _ = thread_handle.join();
                bail!("worker thread exited before the source started");
            }
        };

        info!("Session started at {} Hz", sample_rate);

        Ok(Self {
            readings: reading_rx,
            sample_rate,
            worker: Some(Worker {
                shutdown_tx,
                thread_handle,
            }),
        })
    }

    /// Channel of readings, one per analysed frame.
    ///
    /// At most [`READING_QUEUE_CAPACITY`] readings wait here; newer ones are
    /// dropped until the caller catches up. The channel disconnects once the
    /// worker has exited and every pending reading has been received.
    pub fn readings(&self) -> &Receiver<Reading> {
        &self.readings
    }

    /// Sample rate reported by the source, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Whether the worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.thread_handle.is_finished())
    }

    /// Stops the worker and waits for it to exit. Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        debug!("Shutting down worker...");
        // Fails only if the worker is already gone.
        let _ = worker.shutdown_tx.try_send(());

        worker
            .thread_handle
            .join()
            .map_err(|_| anyhow!("worker thread panicked"))?;
        info!("Session stopped");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Error stopping session: {}", e);
        }
    }
}

fn run_worker<S: FrameSource>(
    source: S,
    readings: Sender<Reading>,
    shutdown: Receiver<()>,
    ready: Sender<Result<u32>>,
) {
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE_CAPACITY);

    let (handle, sample_rate) = match source.start(frame_tx) {
        Ok(started) => started,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if sample_rate == 0 {
        let _ = ready.send(Err(anyhow!("source reported a sample rate of 0 Hz")));
        drop(frame_rx);
        S::release(handle);
        return;
    }

    if ready.send(Ok(sample_rate)).is_err() {
        drop(frame_rx);
        S::release(handle);
        return;
    }

    debug!("Entering frame processing loop...");
    loop {
        crossbeam_channel::select! {
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => match analysis::analyze_frame(&frame, sample_rate) {
                    Ok(reading) => match readings.try_send(reading) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!("Reading dropped, receiver is not draining");
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            debug!("Reading receiver dropped");
                            break;
                        }
                    },
                    Err(e) => warn!("Skipping frame: {}", e),
                },
                Err(_) => {
                    info!("Frame source closed");
                    break;
                }
            },
            recv(shutdown) -> _ => {
                debug!("Received shutdown signal");
                break;
            },
        }
    }

    // Unblocks a source waiting on a full frame queue before it is released.
    drop(frame_rx);
    S::release(handle);
    debug!("Worker finished");
}
