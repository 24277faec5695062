use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::capture::CaptureSource;
use super::frame::AudioFrame;

pub struct AudioData {
    /// Interleaved samples
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f32 {
        (self.samples.len() / self.channels) as f32 / self.sample_rate as f32
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        all_samples.extend_from_slice(sample_buf.samples());
    }

    let data = AudioData {
        samples: all_samples,
        channels: channels.max(1),
        sample_rate,
    };

    log::info!(
        "Decoded audio: {} frames, {} ch, {}Hz, {:.1}s",
        data.samples.len() / data.channels,
        data.channels,
        sample_rate,
        data.duration()
    );

    Ok(data)
}

/// Replays a decoded file as if it were a live loopback stream.
///
/// Reads are paced to wall-clock time and wrap around at the end of the file.
pub struct FileCapture {
    audio: AudioData,
    position: usize,
    started: Option<Instant>,
    delivered_frames: u64,
}

impl FileCapture {
    pub fn open(path: &Path) -> Result<Self> {
        let audio = decode_audio(path)?;
        Self::from_audio(audio)
    }

    pub fn from_audio(audio: AudioData) -> Result<Self> {
        if audio.samples.len() < audio.channels {
            anyhow::bail!("Audio contains no samples");
        }
        Ok(Self {
            audio,
            position: 0,
            started: None,
            delivered_frames: 0,
        })
    }

    pub fn duration(&self) -> f32 {
        self.audio.duration()
    }

    fn next_block(&mut self, frame_count: usize) -> Vec<f32> {
        let channels = self.audio.channels;
        let total_frames = self.audio.samples.len() / channels;
        let mut out = Vec::with_capacity(frame_count * channels);
        for _ in 0..frame_count {
            let start = self.position * channels;
            out.extend_from_slice(&self.audio.samples[start..start + channels]);
            self.position = (self.position + 1) % total_frames;
        }
        out
    }
}

impl CaptureSource for FileCapture {
    fn record(&mut self, frame_count: usize) -> Result<AudioFrame> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let samples = self.next_block(frame_count);
        self.delivered_frames += frame_count as u64;

        // Block like a real device until this block would have been played
        let due = Duration::from_secs_f64(self.delivered_frames as f64 / self.audio.sample_rate as f64);
        let elapsed = started.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }

        Ok(AudioFrame::interleaved(samples, self.audio.channels, self.audio.sample_rate))
    }
}
