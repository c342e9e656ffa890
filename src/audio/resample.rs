//! Channel downmix and sample-rate conversion.
//!
//! The capture device runs at whatever rate and channel count the OS
//! prefers; the ASR engine wants mono 16 kHz.  Linear interpolation is
//! plenty for speech.

/// Downmix interleaved frames to mono and resample to `to_rate`.
pub fn downmix_resample(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    let mono = downmix(samples, channels);
    resample(&mono, from_rate, to_rate)
}

fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels.max(1) as usize;
    if ch == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

fn resample(mono: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || mono.is_empty() {
        return mono.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((mono.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = mono[idx];
        let b = mono.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passthrough_at_same_rate() {
        let s = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix_resample(&s, 1, 16_000, 16_000), s);
    }

    #[test]
    fn stereo_averages_channels() {
        let s = vec![1.0, 0.0, 0.0, 1.0];
        assert_eq!(downmix_resample(&s, 2, 16_000, 16_000), vec![0.5, 0.5]);
    }

    #[test]
    fn downsample_halves_the_length() {
        let s: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = downmix_resample(&s, 1, 32_000, 16_000);
        assert_eq!(out.len(), 50);
        // Every other input sample, linearly interpolated.
        assert!((out[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn upsample_interpolates_between_samples() {
        let s = vec![0.0, 1.0];
        let out = downmix_resample(&s, 1, 8_000, 16_000);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }
}
