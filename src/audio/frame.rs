/// A block of interleaved samples as delivered by a capture source.
#[derive(Clone, Debug)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    pub fn interleaved(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Average all channels into one.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_unchanged() {
        let frame = AudioFrame::mono(vec![0.1, -0.2], 8000);
        assert_eq!(frame.to_mono(), vec![0.1, -0.2]);
        assert_eq!(frame.frames(), 2);
    }

    #[test]
    fn drops_trailing_partial_frame() {
        let frame = AudioFrame::interleaved(vec![1.0, 1.0, 1.0, 0.0, 0.0], 2, 8000);
        assert_eq!(frame.to_mono(), vec![1.0, 0.5]);
    }
}
