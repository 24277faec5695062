//! Time-bounded streaming buffer shared by the capture and analysis threads.

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::frame::AudioFrame;
use super::resample::resample_mono;

/// Read-only copy of the buffer contents at one instant.
#[derive(Clone, Debug)]
pub struct BufferSnapshot {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl BufferSnapshot {
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// The most recent `seconds` of audio, or `None` if not enough is buffered.
    pub fn latest(&self, seconds: f32) -> Option<&[f32]> {
        let needed = (self.sample_rate as f32 * seconds) as usize;
        if needed == 0 || self.samples.len() < needed {
            return None;
        }
        Some(&self.samples[self.samples.len() - needed..])
    }
}

#[derive(Default)]
struct BufferState {
    chunks: VecDeque<Vec<f32>>,
    working_rate: Option<u32>,
    total: usize,
}

/// FIFO of mono chunks holding at most `max_seconds` of audio.
///
/// The first chunk fixes the working sample rate; later chunks at other
/// rates are resampled before insertion.
pub struct StreamingAudioBuffer {
    state: Mutex<BufferState>,
    max_seconds: f32,
}

impl StreamingAudioBuffer {
    pub fn new(max_seconds: f32) -> Self {
        Self {
            state: Mutex::new(BufferState::default()),
            max_seconds,
        }
    }

    /// Downmix a frame to mono and append it.
    pub fn push_frame(&self, frame: &AudioFrame) {
        self.push(&frame.to_mono(), frame.sample_rate);
    }

    /// Append a mono chunk. Frames that fail to resample are dropped.
    pub fn push(&self, samples: &[f32], sample_rate: u32) {
        if samples.is_empty() || sample_rate == 0 {
            return;
        }

        let working_rate = {
            let mut state = self.state.lock();
            *state.working_rate.get_or_insert(sample_rate)
        };

        // Resample outside the lock so snapshots are never held up by it
        let chunk = if sample_rate == working_rate {
            samples.to_vec()
        } else {
            match resample_mono(samples, sample_rate, working_rate) {
                Ok(resampled) => resampled,
                Err(err) => {
                    log::debug!("Dropping {} Hz frame: {}", sample_rate, err);
                    return;
                }
            }
        };

        let mut state = self.state.lock();
        // clear() may have reset the rate while we were resampling
        if state.working_rate != Some(working_rate) {
            return;
        }
        state.total += chunk.len();
        state.chunks.push_back(chunk);

        let max_samples = (working_rate as f32 * self.max_seconds) as usize;
        while state.total > max_samples {
            match state.chunks.pop_front() {
                Some(oldest) => state.total -= oldest.len(),
                None => break,
            }
        }
    }

    /// Concatenated copy of the current contents, `None` until the first frame.
    pub fn snapshot(&self) -> Option<BufferSnapshot> {
        let state = self.state.lock();
        let sample_rate = state.working_rate?;
        let mut samples = Vec::with_capacity(state.total);
        for chunk in &state.chunks {
            samples.extend_from_slice(chunk);
        }
        Some(BufferSnapshot { samples, sample_rate })
    }

    pub fn retained_samples(&self) -> usize {
        self.state.lock().total
    }

    pub fn chunk_count(&self) -> usize {
        self.state.lock().chunks.len()
    }

    pub fn working_rate(&self) -> Option<u32> {
        self.state.lock().working_rate
    }

    /// Drop all audio and forget the working rate.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.chunks.clear();
        state.total = 0;
        state.working_rate = None;
    }
}
