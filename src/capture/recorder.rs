//! Timer-paced capture loop running on its own thread

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::utils::CachePadded;
use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, error, info, instrument, warn};

use crate::capture::convert;
use crate::capture::frame::{Frame, FrameSequence};
use crate::capture::region::{CaptureRegion, RegionSelection};
use crate::capture::source::FrameSource;
use crate::error::CaptureError;
use crate::CaptureConfig;

/// Counters shared with the capture thread
#[derive(Default)]
struct Status {
    active: AtomicBool,
    frames: AtomicU64,
    skipped: AtomicU64,
}

/// Handles for one running (or winding down) recording
struct Session {
    stop_tx: Sender<()>,
    frames_rx: Receiver<Frame>,
    done_rx: Receiver<Box<dyn FrameSource>>,
    handle: JoinHandle<()>,
}

/// Records a fixed screen region at a steady frame rate.
///
/// Frames are moved out of the capture thread one by one over a channel, so
/// the controller never shares the sequence with the producer. Only the
/// counters and the active flag are read across threads.
pub struct CaptureLoop {
    config: CaptureConfig,
    region: Option<CaptureRegion>,
    source: Option<Box<dyn FrameSource>>,
    status: Arc<CachePadded<Status>>,
    session: Option<Session>,
    /// Returns the source of a session whose stop timed out
    pending_source: Option<Receiver<Box<dyn FrameSource>>>,
}

impl CaptureLoop {
    pub fn new(source: impl FrameSource, config: CaptureConfig) -> Self {
        Self::from_boxed(Box::new(source), config)
    }

    /// Like [`CaptureLoop::new`] for a source chosen at runtime
    pub fn from_boxed(source: Box<dyn FrameSource>, config: CaptureConfig) -> Self {
        Self {
            config,
            region: None,
            source: Some(source),
            status: Arc::new(CachePadded::new(Status::default())),
            session: None,
            pending_source: None,
        }
    }

    /// Set the region to record, rejecting regions below the configured minimum
    pub fn configure(&mut self, region: CaptureRegion) -> Result<(), CaptureError> {
        if self.is_active() {
            return Err(CaptureError::AlreadyRunning);
        }
        region.validate(self.config.min_region_size)?;
        info!("Capture region set to {}", region);
        self.region = Some(region);
        Ok(())
    }

    /// Apply the region picker's answer; a cancelled pick clears the region
    pub fn configure_selection(&mut self, selection: RegionSelection) -> Result<(), CaptureError> {
        match selection {
            RegionSelection::Selected(region) => self.configure(region),
            RegionSelection::Cancelled => {
                if self.is_active() {
                    return Err(CaptureError::AlreadyRunning);
                }
                debug!("Region selection cancelled");
                self.region = None;
                Ok(())
            }
        }
    }

    pub fn region(&self) -> Option<CaptureRegion> {
        self.region
    }

    /// Start recording on a background thread.
    ///
    /// `on_frame` runs on the capture thread after every stored frame with
    /// the new frame count. It must return quickly.
    #[instrument(skip(self, on_frame))]
    pub fn start<F>(&mut self, target_fps: u32, on_frame: F) -> Result<(), CaptureError>
    where
        F: FnMut(u64) + Send + 'static,
    {
        if self.is_active() {
            return Err(CaptureError::AlreadyRunning);
        }
        let region = self.region.ok_or(CaptureError::NoRegionConfigured)?;
        if target_fps == 0 {
            return Err(CaptureError::InvalidFps);
        }

        // A session that ended on its own still holds frames; a new
        // recording starts from an empty sequence
        if self.session.is_some() {
            let stale = self.stop();
            if !stale.is_empty() {
                warn!("Discarding {} frames from the previous session", stale.len());
            }
        }

        let source = self.take_source()?;

        self.status.frames.store(0, Ordering::SeqCst);
        self.status.skipped.store(0, Ordering::SeqCst);
        self.status.active.store(true, Ordering::SeqCst);

        let (stop_tx, stop_rx) = flume::bounded(1);
        let (frames_tx, frames_rx) = flume::unbounded();
        let (done_tx, done_rx) = flume::bounded(1);

        let worker = Worker {
            source,
            region,
            interval: Duration::from_secs_f64(1.0 / f64::from(target_fps)),
            max_consecutive_failures: self.config.max_consecutive_failures,
            status: Arc::clone(&self.status),
            stop_rx,
            frames_tx,
        };

        let handle = thread::Builder::new()
            .name("opencut-capture".into())
            .spawn(move || {
                let source = worker.run(on_frame);
                let _ = done_tx.send(source);
            })
            .map_err(|e| {
                self.status.active.store(false, Ordering::SeqCst);
                CaptureError::Spawn(e)
            })?;

        info!("Recording {} at {} fps", region, target_fps);
        self.session = Some(Session {
            stop_tx,
            frames_rx,
            done_rx,
            handle,
        });
        Ok(())
    }

    /// Stop recording and hand over every frame captured so far.
    ///
    /// Waits at most `stop_timeout_ms` for the capture thread to exit; if it
    /// does not, the frames already delivered are returned anyway.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> FrameSequence {
        let Some(session) = self.session.take() else {
            return FrameSequence::new();
        };

        let _ = session.stop_tx.try_send(());

        let timeout = Duration::from_millis(self.config.stop_timeout_ms);
        match session.done_rx.recv_timeout(timeout) {
            Ok(source) => {
                self.source = Some(source);
                if session.handle.join().is_err() {
                    warn!("Capture thread panicked while exiting");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Capture thread did not exit within {:?}, returning frames captured so far",
                    timeout
                );
                self.pending_source = Some(session.done_rx);
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("Capture thread exited without returning its source");
            }
        }

        self.status.active.store(false, Ordering::SeqCst);

        let frames: FrameSequence = session.frames_rx.try_iter().collect();
        info!(
            "Recording stopped: {} frames, {} skipped",
            frames.len(),
            self.skipped_count()
        );
        frames
    }

    pub fn is_active(&self) -> bool {
        self.status.active.load(Ordering::SeqCst)
    }

    pub fn frame_count(&self) -> u64 {
        self.status.frames.load(Ordering::SeqCst)
    }

    /// Grabs that failed during the current or last session
    pub fn skipped_count(&self) -> u64 {
        self.status.skipped.load(Ordering::SeqCst)
    }

    fn take_source(&mut self) -> Result<Box<dyn FrameSource>, CaptureError> {
        if let Some(source) = self.source.take() {
            return Ok(source);
        }

        let pending = self.pending_source.take().ok_or(CaptureError::SourceBusy)?;
        let timeout = Duration::from_millis(self.config.stop_timeout_ms);
        match pending.recv_timeout(timeout) {
            Ok(source) => Ok(source),
            Err(RecvTimeoutError::Timeout) => {
                self.pending_source = Some(pending);
                Err(CaptureError::SourceBusy)
            }
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::SourceBusy),
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            // Dropping the sender is enough to wake the thread; don't wait
            let _ = session.stop_tx.try_send(());
        }
    }
}

/// State moved onto the capture thread
struct Worker {
    source: Box<dyn FrameSource>,
    region: CaptureRegion,
    interval: Duration,
    max_consecutive_failures: u32,
    status: Arc<CachePadded<Status>>,
    stop_rx: Receiver<()>,
    frames_tx: Sender<Frame>,
}

impl Worker {
    fn run<F: FnMut(u64)>(mut self, mut on_frame: F) -> Box<dyn FrameSource> {
        debug!("Capture thread started with {}", self.source.name());
        let mut consecutive_failures = 0u32;

        loop {
            match self.stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            let start = Instant::now();

            match self.source.grab(&self.region) {
                Ok(frame) => {
                    consecutive_failures = 0;
                    let sequence = self.status.frames.load(Ordering::SeqCst) + 1;
                    let frame = convert::normalize(frame).stamped(sequence, start);
                    if self.frames_tx.send(frame).is_err() {
                        debug!("Frame receiver dropped, stopping capture");
                        break;
                    }
                    let count = self.status.frames.fetch_add(1, Ordering::SeqCst) + 1;
                    metrics::counter!("frames_captured").increment(1);
                    on_frame(count);
                }
                Err(e) => {
                    consecutive_failures += 1;
                    self.status.skipped.fetch_add(1, Ordering::SeqCst);
                    metrics::counter!("frames_skipped").increment(1);
                    warn!("Capture error, skipping frame: {}", e);

                    if self.max_consecutive_failures > 0
                        && consecutive_failures >= self.max_consecutive_failures
                    {
                        error!(
                            "{} consecutive capture failures, ending recording",
                            consecutive_failures
                        );
                        break;
                    }
                }
            }

            let elapsed = start.elapsed();
            metrics::histogram!("capture_time_us").record(elapsed.as_micros() as f64);

            match self.interval.checked_sub(elapsed) {
                Some(wait) => match self.stop_rx.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                },
                None => debug!(
                    "Capture took {:?}, longer than the {:?} interval",
                    elapsed, self.interval
                ),
            }
        }

        self.status.active.store(false, Ordering::SeqCst);
        debug!("Capture thread exiting");
        self.source
    }
}
