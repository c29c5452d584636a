//! PCM sample conversion helpers.

/// Convert float samples in [-1, 1] to 16-bit signed integers.
///
/// Samples are clamped to the valid range before scaling so clipped input
/// saturates instead of wrapping.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Encode samples as 16-bit little-endian PCM bytes for transmission.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Mix interleaved multi-channel float samples down to mono by summing the
/// channels and saturating to [-1, 1]. No division, to preserve volume.
pub fn mix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / channels);
    for frame in samples.chunks_exact(channels) {
        let sum: f32 = frame.iter().sum();
        mono.push(sum.clamp(-1.0, 1.0));
    }
    mono
}

/// Downsample by decimation: take every Nth sample.
///
/// Upsampling is not supported; input at or below the target rate is
/// returned unchanged.
pub fn decimate(samples: Vec<f32>, input_rate: u32, target_rate: u32) -> Vec<f32> {
    if input_rate <= target_rate || target_rate == 0 {
        return samples;
    }

    let ratio = (input_rate / target_rate) as usize;
    if ratio <= 1 {
        return samples;
    }

    samples.into_iter().step_by(ratio).collect()
}
