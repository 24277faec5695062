use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::error::ResampleError;

/// Resample a mono chunk from `from_rate` to `to_rate` using rubato's sinc resampler.
///
/// The whole chunk is processed as one block, so output length is roughly
/// `samples.len() * to_rate / from_rate`.
pub fn resample_mono(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, ResampleError> {
    if from_rate == 0 {
        return Err(ResampleError::InvalidRate(from_rate));
    }
    if to_rate == 0 {
        return Err(ResampleError::InvalidRate(to_rate));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0, // max relative ratio
        params,
        samples.len(),
        1, // mono
    )
    .map_err(|e| ResampleError::Setup {
        from: from_rate,
        to: to_rate,
        reason: e.to_string(),
    })?;

    let input = vec![samples.to_vec()];
    let output = resampler
        .process(&input, None)
        .map_err(|e| ResampleError::Process(e.to_string()))?;

    Ok(output.into_iter().next().unwrap_or_default())
}
