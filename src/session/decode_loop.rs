//! The background decode loop.

use super::SessionStats;
use crate::capture::{Frame, FrameGeometry, FrameSlot, SessionConfig};
use crate::decode::{DecodeResult, Decoder};
use crate::preprocess::{Preprocessor, PreprocessorFactory};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when driving a decode session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("decode loop already running for this session")]
    AlreadyRunning,
    #[error("failed to spawn decode worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The preprocessor handle is created lazily by the worker and
/// destroyed by the owner, strictly after the worker has been joined.
/// It carries the geometry it was built for so a restart with a
/// different preview geometry replaces it instead of reusing it.
type SharedPreprocessor = Arc<Mutex<Option<PreprocessorHandle>>>;

struct PreprocessorHandle {
    geometry: FrameGeometry,
    inner: Box<dyn Preprocessor>,
}

/// One decode session tied to one open camera preview.
///
/// Runs at most one decode loop at a time on a dedicated worker
/// thread. The loop repeatedly reads the freshest frame from the slot,
/// preprocesses it, and attempts a decode with alternating polarity,
/// until it finds a result (delivered exactly once through the
/// caller's callback) or the owner cancels.
///
/// The result callback runs on the worker thread; marshaling onto a
/// particular context is the callback's job, typically a channel send.
pub struct DecodeSession {
    slot: Arc<FrameSlot>,
    decoder: Arc<dyn Decoder>,
    factory: Arc<dyn PreprocessorFactory>,
    config: SessionConfig,
    stats: Arc<SessionStats>,
    preprocessor: SharedPreprocessor,
    worker: Option<Worker>,
}

struct Worker {
    cancel: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

/// Everything the worker thread needs, moved in at spawn.
struct WorkerCtx {
    slot: Arc<FrameSlot>,
    decoder: Arc<dyn Decoder>,
    factory: Arc<dyn PreprocessorFactory>,
    preprocessor: SharedPreprocessor,
    stats: Arc<SessionStats>,
    geometry: FrameGeometry,
    idle_backoff_us: u64,
    cancel: Arc<AtomicBool>,
}

impl DecodeSession {
    /// Creates a session with default tuning.
    pub fn new(
        slot: Arc<FrameSlot>,
        decoder: Arc<dyn Decoder>,
        factory: Arc<dyn PreprocessorFactory>,
    ) -> Self {
        Self::with_config(slot, decoder, factory, SessionConfig::default())
    }

    /// Creates a session with explicit tuning.
    pub fn with_config(
        slot: Arc<FrameSlot>,
        decoder: Arc<dyn Decoder>,
        factory: Arc<dyn PreprocessorFactory>,
        config: SessionConfig,
    ) -> Self {
        Self {
            slot,
            decoder,
            factory,
            config,
            stats: Arc::new(SessionStats::default()),
            preprocessor: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    /// Starts the decode loop for a preview with the given geometry.
    ///
    /// The slot is cleared first so a stale frame from a previous
    /// preview is never decoded. `on_result` is invoked at most once,
    /// from the worker thread, and never after [`cancel`] has
    /// returned.
    ///
    /// Returns [`SessionError::AlreadyRunning`] if a loop has been
    /// started and not yet cancelled; a loop that stopped itself after
    /// a result still counts until the owner reaps it with [`cancel`].
    ///
    /// A preprocessor handle surviving from an earlier loop is reused
    /// only when the geometry matches; restarting with a different
    /// geometry replaces it on the first attempt.
    ///
    /// [`cancel`]: DecodeSession::cancel
    pub fn start<F>(&mut self, geometry: FrameGeometry, on_result: F) -> Result<(), SessionError>
    where
        F: FnOnce(DecodeResult) + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        self.slot.clear();
        let cancel = Arc::new(AtomicBool::new(false));
        let ctx = WorkerCtx {
            slot: Arc::clone(&self.slot),
            decoder: Arc::clone(&self.decoder),
            factory: Arc::clone(&self.factory),
            preprocessor: Arc::clone(&self.preprocessor),
            stats: Arc::clone(&self.stats),
            geometry,
            idle_backoff_us: self.config.idle_backoff_us,
            cancel: Arc::clone(&cancel),
        };

        let handle = thread::Builder::new()
            .name("decode-loop".to_string())
            .spawn(move || run_loop(ctx, on_result))?;

        self.worker = Some(Worker { cancel, handle });
        tracing::info!(
            width = geometry.width,
            height = geometry.height,
            orientation = geometry.orientation.degrees(),
            "Decode loop started"
        );
        Ok(())
    }

    /// Requests cancellation and blocks until the worker has exited.
    ///
    /// Safe to call when no loop is running. Once this returns, no
    /// result callback will fire: a result produced concurrently with
    /// the cancel request is suppressed (cancel wins).
    pub fn cancel(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel.store(true, Ordering::Release);
            if worker.handle.join().is_err() {
                // The loop catches attempt panics itself; reaching
                // this means the worker died outside an attempt.
                tracing::error!("Decode worker panicked");
            }
            tracing::debug!("Decode loop joined");
        }
    }

    /// Cancels any running loop and destroys the preprocessor handle.
    ///
    /// Call when the camera preview closes. The handle is dropped only
    /// after the worker has been joined, so no loop iteration can
    /// still be using it.
    pub fn close(&mut self) {
        self.cancel();
        let mut guard = self
            .preprocessor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            tracing::debug!("Preprocessor destroyed");
        }
    }

    /// Returns true if a loop has been started and not yet reaped.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Returns the shared activity counters.
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_loop<F>(ctx: WorkerCtx, on_result: F)
where
    F: FnOnce(DecodeResult) + Send + 'static,
{
    let mut on_result = Some(on_result);
    // Polarity of the next attempt; toggled unconditionally after
    // every attempt, whether or not it decoded anything. Empty polls
    // are not attempts and leave it untouched.
    let mut invert = false;

    loop {
        if ctx.cancel.load(Ordering::Acquire) {
            tracing::debug!("Decode loop cancelled");
            return;
        }

        // Re-read the slot every iteration; the source may have
        // overwritten the frame since the last attempt.
        let Some(frame) = ctx.slot.latest() else {
            ctx.stats.record_empty_poll();
            idle(ctx.idle_backoff_us);
            continue;
        };

        let attempt = catch_unwind(AssertUnwindSafe(|| attempt_decode(&ctx, &frame, invert)));
        invert = !invert;
        ctx.stats.record_attempt();

        match attempt {
            Ok(Some(result)) => {
                // Cancel wins: a result produced after cancellation was
                // requested is never handed off.
                if ctx.cancel.load(Ordering::Acquire) {
                    tracing::debug!("Result suppressed by cancellation");
                    return;
                }
                ctx.stats.record_result();
                tracing::info!(format = %result.format(), "Barcode found");
                if let Some(deliver) = on_result.take() {
                    deliver(result);
                }
                return;
            }
            Ok(None) => {}
            Err(_) => {
                ctx.stats.record_panic();
                tracing::warn!(
                    frame = frame.sequence(),
                    "Decode attempt panicked, continuing"
                );
            }
        }
    }
}

/// One preprocess-and-decode attempt against the given frame.
fn attempt_decode(ctx: &WorkerCtx, frame: &Frame, invert: bool) -> Option<DecodeResult> {
    let mut guard = ctx
        .preprocessor
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    // A handle left over from a previous loop is only reusable if the
    // preview geometry has not changed in between.
    if guard
        .as_ref()
        .is_some_and(|handle| handle.geometry != ctx.geometry)
    {
        tracing::debug!("Preview geometry changed, replacing preprocessor");
        *guard = None;
    }

    // Lazily created on the first attempt, reused for every frame.
    if guard.is_none() {
        match ctx.factory.create(ctx.geometry) {
            Ok(inner) => {
                *guard = Some(PreprocessorHandle {
                    geometry: ctx.geometry,
                    inner,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Preprocessor creation failed");
                return None;
            }
        }
    }
    let preprocessor = guard.as_mut()?;

    let processed = preprocessor.inner.process(frame.pixels());
    tracing::trace!(
        frame = frame.sequence(),
        out_width = processed.width,
        out_height = processed.height,
        invert,
        "Attempting decode"
    );

    ctx.decoder
        .decode(&processed.pixels, processed.width, processed.height, invert)
}

fn idle(backoff_us: u64) {
    if backoff_us == 0 {
        thread::yield_now();
    } else {
        thread::sleep(Duration::from_micros(backoff_us));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Orientation;
    use crate::decode::{BarcodeFormat, MockDecoder};
    use crate::preprocess::{PreprocessError, ProcessedFrame, RotationFactory};
    use proptest::prelude::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::mpsc;
    use std::time::Instant;

    const W: u32 = 16;
    const H: u32 = 16;

    fn geometry() -> FrameGeometry {
        FrameGeometry::new(W, H, Orientation::Deg0)
    }

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; (W * H) as usize], W, H, Orientation::Deg0, sequence)
    }

    fn hit() -> DecodeResult {
        DecodeResult::new("https://example.com", BarcodeFormat::QrCode)
    }

    /// Factory/preprocessor pair counting create and process calls.
    struct CountingFactory {
        creates: Arc<AtomicU64>,
        processes: Arc<AtomicU64>,
    }

    impl CountingFactory {
        fn new() -> (Self, Arc<AtomicU64>, Arc<AtomicU64>) {
            let creates = Arc::new(AtomicU64::new(0));
            let processes = Arc::new(AtomicU64::new(0));
            (
                Self {
                    creates: Arc::clone(&creates),
                    processes: Arc::clone(&processes),
                },
                creates,
                processes,
            )
        }
    }

    impl PreprocessorFactory for CountingFactory {
        fn create(
            &self,
            geometry: FrameGeometry,
        ) -> Result<Box<dyn Preprocessor>, PreprocessError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingPreprocessor {
                geometry,
                processes: Arc::clone(&self.processes),
            }))
        }
    }

    struct CountingPreprocessor {
        geometry: FrameGeometry,
        processes: Arc<AtomicU64>,
    }

    impl Preprocessor for CountingPreprocessor {
        fn process(&mut self, pixels: &[u8]) -> ProcessedFrame {
            self.processes.fetch_add(1, Ordering::SeqCst);
            ProcessedFrame {
                pixels: pixels.to_vec(),
                width: self.geometry.width,
                height: self.geometry.height,
            }
        }
    }

    /// Decoder that blocks inside `decode` until released, then
    /// reports a hit. Used to pin down the cancel/result race.
    struct BlockingDecoder {
        entered: Arc<AtomicBool>,
        release: Arc<AtomicBool>,
    }

    impl Decoder for BlockingDecoder {
        fn decode(&self, _: &[u8], _: u32, _: u32, _: bool) -> Option<DecodeResult> {
            self.entered.store(true, Ordering::SeqCst);
            while !self.release.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            Some(hit())
        }
    }

    fn wait_for(what: &str, condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_no_result_without_success() {
        let slot = Arc::new(FrameSlot::new());
        let decoder = Arc::new(MockDecoder::never());
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::clone(&decoder) as Arc<dyn Decoder>,
            Arc::new(RotationFactory),
        );

        let delivered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&delivered);
        session
            .start(geometry(), move |_| flag.store(true, Ordering::SeqCst))
            .unwrap();
        slot.publish(frame(1));

        // The loop keeps attempting indefinitely without terminating.
        wait_for("decode attempts", || decoder.calls() > 10);
        assert!(session.is_running());
        assert!(!delivered.load(Ordering::SeqCst));

        session.cancel();
        assert!(!session.is_running());
        assert!(!delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_single_result_then_stop() {
        let slot = Arc::new(FrameSlot::new());
        let decoder = Arc::new(MockDecoder::succeeding_after(3, hit()));
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::clone(&decoder) as Arc<dyn Decoder>,
            Arc::new(RotationFactory),
        );

        let (tx, rx) = mpsc::channel();
        session
            .start(geometry(), move |result| {
                let _ = tx.send(result);
            })
            .unwrap();
        slot.publish(frame(1));

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.text(), "https://example.com");
        assert_eq!(result.format(), BarcodeFormat::QrCode);

        // Exactly one delivery, then the loop stops making calls.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(decoder.calls(), 3);
        assert_eq!(session.stats().results(), 1);

        session.cancel();
    }

    #[test]
    fn test_inversion_alternates() {
        let slot = Arc::new(FrameSlot::new());
        let decoder = Arc::new(MockDecoder::succeeding_after(4, hit()));
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::clone(&decoder) as Arc<dyn Decoder>,
            Arc::new(RotationFactory),
        );

        let (tx, rx) = mpsc::channel();
        session
            .start(geometry(), move |result| {
                let _ = tx.send(result);
            })
            .unwrap();
        slot.publish(frame(1));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(decoder.recorded_inverts(), [false, true, false, true]);
        session.cancel();
    }

    #[test]
    fn test_cancel_joins_and_suppresses_late_result() {
        let entered = Arc::new(AtomicBool::new(false));
        let release = Arc::new(AtomicBool::new(false));
        let decoder = Arc::new(BlockingDecoder {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });

        let slot = Arc::new(FrameSlot::new());
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            decoder as Arc<dyn Decoder>,
            Arc::new(RotationFactory),
        );

        let delivered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&delivered);
        session
            .start(geometry(), move |_| flag.store(true, Ordering::SeqCst))
            .unwrap();
        slot.publish(frame(1));

        // Wait until the worker is blocked inside the decoder.
        wait_for("decoder entry", || entered.load(Ordering::SeqCst));
        let cancel_flag = Arc::clone(&session.worker.as_ref().unwrap().cancel);

        // Cancel from another thread; it blocks joining the worker.
        let canceller = thread::spawn(move || {
            session.cancel();
            session
        });
        wait_for("cancel request", || cancel_flag.load(Ordering::SeqCst));

        // Let the decoder finish; its result must now be suppressed.
        release.store(true, Ordering::SeqCst);
        let session = canceller.join().unwrap();

        assert!(!session.is_running());
        assert!(!delivered.load(Ordering::SeqCst));
        assert_eq!(session.stats().results(), 0);
    }

    #[test]
    fn test_preprocessor_created_once() {
        let (factory, creates, processes) = CountingFactory::new();
        let slot = Arc::new(FrameSlot::new());
        let decoder = Arc::new(MockDecoder::succeeding_after(5, hit()));
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::clone(&decoder) as Arc<dyn Decoder>,
            Arc::new(factory),
        );

        let (tx, rx) = mpsc::channel();
        session
            .start(geometry(), move |result| {
                let _ = tx.send(result);
            })
            .unwrap();
        slot.publish(frame(1));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(creates.load(Ordering::SeqCst), 1);
        assert_eq!(processes.load(Ordering::SeqCst), 5);
        assert_eq!(decoder.calls(), 5);
        session.cancel();
    }

    #[test]
    fn test_restart_with_new_geometry_replaces_preprocessor() {
        let (factory, creates, _processes) = CountingFactory::new();
        let slot = Arc::new(FrameSlot::new());
        let decoder = Arc::new(MockDecoder::succeeding_after(1, hit()));
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::clone(&decoder) as Arc<dyn Decoder>,
            Arc::new(factory),
        );

        let run = |session: &mut DecodeSession, geometry: FrameGeometry, frame: Frame| {
            let (tx, rx) = mpsc::channel();
            session
                .start(geometry, move |result| {
                    let _ = tx.send(result);
                })
                .unwrap();
            slot.publish(frame);
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
            session.cancel();
        };

        run(&mut session, geometry(), frame(1));
        assert_eq!(creates.load(Ordering::SeqCst), 1);

        // Restarting with a rotated preview must not decode through
        // the handle built for the old geometry.
        let rotated = FrameGeometry::new(W, H, Orientation::Deg90);
        run(
            &mut session,
            rotated,
            Frame::new(vec![0u8; (W * H) as usize], W, H, Orientation::Deg90, 2),
        );
        assert_eq!(creates.load(Ordering::SeqCst), 2);

        // Restarting with the same geometry reuses the handle.
        run(
            &mut session,
            rotated,
            Frame::new(vec![0u8; (W * H) as usize], W, H, Orientation::Deg90, 3),
        );
        assert_eq!(creates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_slot_makes_no_calls() {
        let (factory, creates, _processes) = CountingFactory::new();
        let slot = Arc::new(FrameSlot::new());
        let decoder = Arc::new(MockDecoder::succeeding_after(1, hit()));
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::clone(&decoder) as Arc<dyn Decoder>,
            Arc::new(factory),
        );

        let (tx, rx) = mpsc::channel();
        session
            .start(geometry(), move |result| {
                let _ = tx.send(result);
            })
            .unwrap();

        // No frame yet: the loop polls but never touches the
        // preprocessor or the decoder.
        let stats = session.stats();
        wait_for("empty polls", || stats.empty_polls() > 3);
        assert_eq!(creates.load(Ordering::SeqCst), 0);
        assert_eq!(decoder.calls(), 0);

        // First frame: exactly one create/process/decode and a result.
        slot.publish(frame(1));
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.text(), "https://example.com");
        assert_eq!(creates.load(Ordering::SeqCst), 1);
        assert_eq!(decoder.calls(), 1);

        session.cancel();
    }

    #[test]
    fn test_double_start_rejected() {
        let slot = Arc::new(FrameSlot::new());
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::new(MockDecoder::never()) as Arc<dyn Decoder>,
            Arc::new(RotationFactory),
        );

        session.start(geometry(), |_| {}).unwrap();
        assert!(matches!(
            session.start(geometry(), |_| {}),
            Err(SessionError::AlreadyRunning)
        ));

        // After cancel the session can be restarted.
        session.cancel();
        session.start(geometry(), |_| {}).unwrap();
        session.cancel();
    }

    #[test]
    fn test_stale_frame_cleared_on_start() {
        let slot = Arc::new(FrameSlot::new());
        let decoder = Arc::new(MockDecoder::succeeding_after(1, hit()));
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::clone(&decoder) as Arc<dyn Decoder>,
            Arc::new(RotationFactory),
        );

        // A frame left over from a previous preview must not be decoded.
        slot.publish(frame(99));
        let (tx, rx) = mpsc::channel();
        session
            .start(geometry(), move |result| {
                let _ = tx.send(result);
            })
            .unwrap();

        let stats = session.stats();
        wait_for("empty polls", || stats.empty_polls() > 3);
        assert_eq!(decoder.calls(), 0);

        slot.publish(frame(100));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        session.cancel();
    }

    #[test]
    fn test_panicking_attempt_is_caught() {
        struct PanickyDecoder {
            calls: AtomicU64,
        }

        impl Decoder for PanickyDecoder {
            fn decode(&self, _: &[u8], _: u32, _: u32, _: bool) -> Option<DecodeResult> {
                let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call == 1 {
                    panic!("synthetic decoder failure");
                }
                if call >= 3 {
                    Some(hit())
                } else {
                    None
                }
            }
        }

        let slot = Arc::new(FrameSlot::new());
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::new(PanickyDecoder {
                calls: AtomicU64::new(0),
            }) as Arc<dyn Decoder>,
            Arc::new(RotationFactory),
        );

        let (tx, rx) = mpsc::channel();
        session
            .start(geometry(), move |result| {
                let _ = tx.send(result);
            })
            .unwrap();
        slot.publish(frame(1));

        // The panic on the first attempt is caught and the loop keeps
        // going until the decoder eventually reports a hit.
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.text(), "https://example.com");
        assert_eq!(session.stats().panics_caught(), 1);
        session.cancel();
    }

    #[test]
    fn test_close_destroys_preprocessor_after_join() {
        let (factory, creates, _processes) = CountingFactory::new();
        let slot = Arc::new(FrameSlot::new());
        let mut session = DecodeSession::new(
            Arc::clone(&slot),
            Arc::new(MockDecoder::never()) as Arc<dyn Decoder>,
            Arc::new(factory),
        );

        session.start(geometry(), |_| {}).unwrap();
        slot.publish(frame(1));
        wait_for("preprocessor creation", || {
            creates.load(Ordering::SeqCst) == 1
        });

        session.close();
        assert!(!session.is_running());
        assert!(session
            .preprocessor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Inversion strictly alternates starting at `false`, no
        /// matter which attempt finally decodes.
        #[test]
        fn prop_inversion_alternates(n in 1u64..12) {
            let slot = Arc::new(FrameSlot::new());
            let decoder = Arc::new(MockDecoder::succeeding_after(n, hit()));
            let mut session = DecodeSession::new(
                Arc::clone(&slot),
                Arc::clone(&decoder) as Arc<dyn Decoder>,
                Arc::new(RotationFactory),
            );

            let (tx, rx) = mpsc::channel();
            session
                .start(geometry(), move |result| {
                    let _ = tx.send(result);
                })
                .unwrap();
            slot.publish(frame(1));
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
            session.cancel();

            let expected: Vec<bool> = (0..n).map(|i| i % 2 == 1).collect();
            prop_assert_eq!(decoder.recorded_inverts(), expected);
        }
    }
}
