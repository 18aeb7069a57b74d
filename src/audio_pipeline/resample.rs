//! Sample-rate conversion
//!
//! FFT resampler fed in fixed chunks; the trailing chunk is zero-padded,
//! which is harmless for speech windows that get padded downstream anyway.

use crate::error::{Error, Result};
use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 1024;

/// Resample mono f32 samples from `from_hz` to `to_hz`
pub fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>> {
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(from_hz as usize, to_hz as usize, CHUNK_SIZE, 1, 1)
            .map_err(|e| Error::DecodeFailure(format!("resampler init: {e}")))?;

    let mut out =
        Vec::with_capacity(samples.len() * to_hz as usize / from_hz as usize + CHUNK_SIZE);
    let mut pos = 0;

    while pos < samples.len() {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();
        chunk.resize(needed, 0.0);

        let processed = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::DecodeFailure(format!("resample: {e}")))?;
        out.extend_from_slice(&processed[0]);
        pos = end;
    }

    Ok(out)
}
