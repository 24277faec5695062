//! Capture worker: pulls frames from a source and feeds the streaming buffer.

use anyhow::Result;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::buffer::StreamingAudioBuffer;
use super::frame::AudioFrame;

/// Something that can record the audio currently being played.
///
/// `record` may block until `frame_count` frames are available. Errors are
/// treated as transient and retried after a backoff.
pub trait CaptureSource: Send {
    fn record(&mut self, frame_count: usize) -> Result<AudioFrame>;
}

pub struct CaptureWorker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    pub fn spawn(
        mut source: Box<dyn CaptureSource>,
        buffer: Arc<StreamingAudioBuffer>,
        frame_count: usize,
        backoff: Duration,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("tonesteer-capture".into())
            .spawn(move || {
                log::debug!("Capture worker started ({} frames per read)", frame_count);
                loop {
                    match stop_rx.try_recv() {
                        Err(crossbeam_channel::TryRecvError::Empty) => {}
                        _ => break,
                    }
                    match source.record(frame_count) {
                        Ok(frame) => buffer.push_frame(&frame),
                        Err(err) => {
                            log::error!("Capture error: {:#}", err);
                            match stop_rx.recv_timeout(backoff) {
                                Err(RecvTimeoutError::Timeout) => {}
                                _ => break,
                            }
                        }
                    }
                }
                log::debug!("Capture worker stopped");
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signal the worker and wait for it. Returns once the current `record` call returns.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Capture worker panicked");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySource {
        calls: Arc<AtomicUsize>,
    }

    impl CaptureSource for FlakySource {
        fn record(&mut self, frame_count: usize) -> Result<AudioFrame> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            if n % 2 == 1 {
                anyhow::bail!("device busy");
            }
            Ok(AudioFrame::interleaved(vec![0.5; frame_count * 2], 2, 1000))
        }
    }

    #[test]
    fn feeds_buffer_and_survives_errors() {
        let buffer = Arc::new(StreamingAudioBuffer::new(60.0));
        let calls = Arc::new(AtomicUsize::new(0));
        let worker = CaptureWorker::spawn(
            Box::new(FlakySource { calls: calls.clone() }),
            buffer.clone(),
            10,
            Duration::from_millis(5),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        worker.stop();

        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert!(buffer.retained_samples() >= 10);
        assert_eq!(buffer.retained_samples() % 10, 0);
    }
}
