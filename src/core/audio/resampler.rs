//! PCM16 sample-rate conversion.
//!
//! Two algorithms are available and selected per deployment:
//!
//! - [`ResampleAlgorithm::Decimate`] keeps two of every three samples (the
//!   first and the third). It only expresses a 3:2 ratio such as
//!   24000Hz -> 16000Hz and costs nothing beyond a copy.
//! - [`ResampleAlgorithm::Linear`] handles any pair of integer rates by linear
//!   interpolation between the two neighbouring input samples.
//!
//! Both are pure: the same input always produces the same output and no
//! state is carried between calls.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AudioError, AudioResult, BYTES_PER_SAMPLE};

/// Rate conversion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleAlgorithm {
    /// Nearest-neighbour 3:2 decimation (default)
    #[default]
    Decimate,
    /// Linear interpolation for arbitrary integer rates
    Linear,
}

impl ResampleAlgorithm {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decimate => "decimate",
            Self::Linear => "linear",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "linear" | "interpolate" | "interpolation" => Self::Linear,
            "decimate" | "decimation" => Self::Decimate,
            _ => Self::default(),
        }
    }
}

impl fmt::Display for ResampleAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configured conversion between two fixed rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    algorithm: ResampleAlgorithm,
    source_rate: u32,
    target_rate: u32,
}

impl Resampler {
    /// Create a resampler, rejecting combinations the algorithm cannot express.
    pub fn new(
        algorithm: ResampleAlgorithm,
        source_rate: u32,
        target_rate: u32,
    ) -> AudioResult<Self> {
        validate_rates(algorithm, source_rate, target_rate)?;
        Ok(Self {
            algorithm,
            source_rate,
            target_rate,
        })
    }

    pub fn algorithm(&self) -> ResampleAlgorithm {
        self.algorithm
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Convert one buffer.
    pub fn process(&self, input: &[u8]) -> AudioResult<Vec<u8>> {
        resample(input, self.algorithm, self.source_rate, self.target_rate)
    }
}

fn validate_rates(
    algorithm: ResampleAlgorithm,
    source_rate: u32,
    target_rate: u32,
) -> AudioResult<()> {
    if source_rate == 0 || target_rate == 0 {
        return Err(AudioError::InvalidSampleRate {
            source_rate,
            target_rate,
        });
    }
    if algorithm == ResampleAlgorithm::Decimate
        && source_rate != target_rate
        && (source_rate as u64) * 2 != (target_rate as u64) * 3
    {
        return Err(AudioError::UnsupportedRatio {
            algorithm,
            source_rate,
            target_rate,
        });
    }
    Ok(())
}

/// Convert little-endian PCM16 `input` from `source_rate` to `target_rate`.
///
/// # Errors
///
/// - [`AudioError::InvalidBufferLength`] if `input` has an odd length
/// - [`AudioError::InvalidSampleRate`] if either rate is zero
/// - [`AudioError::UnsupportedRatio`] if decimation is asked for anything
///   other than 3:2
pub fn resample(
    input: &[u8],
    algorithm: ResampleAlgorithm,
    source_rate: u32,
    target_rate: u32,
) -> AudioResult<Vec<u8>> {
    if input.len() % BYTES_PER_SAMPLE != 0 {
        return Err(AudioError::InvalidBufferLength(input.len()));
    }
    validate_rates(algorithm, source_rate, target_rate)?;

    if source_rate == target_rate {
        return Ok(input.to_vec());
    }

    let samples = read_samples(input);
    let output = match algorithm {
        ResampleAlgorithm::Decimate => decimate(&samples),
        ResampleAlgorithm::Linear => interpolate(&samples, source_rate, target_rate),
    };
    Ok(write_samples(&output))
}

fn read_samples(input: &[u8]) -> Vec<i16> {
    input
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

fn write_samples(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Keep samples 0 and 2 of every group of three.
fn decimate(samples: &[i16]) -> Vec<i16> {
    let out_len = samples.len() * 2 / 3;
    (0..out_len)
        .map(|j| samples[(j / 2) * 3 + (j % 2) * 2])
        .collect()
}

fn interpolate(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if samples.is_empty() {
        return Vec::new();
    }
    let out_len = (samples.len() as u64 * target_rate as u64 / source_rate as u64) as usize;
    let step = source_rate as f64 / target_rate as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|k| {
            let position = k as f64 * step;
            let index = (position.floor() as usize).min(last);
            let frac = position - index as f64;
            let a = samples[index] as f64;
            let b = samples[(index + 1).min(last)] as f64;
            let value = (a + (b - a) * frac).round();
            value.clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// PCM16 buffer whose samples equal their index.
    fn indexed_buffer(samples: usize) -> Vec<u8> {
        let values: Vec<i16> = (0..samples).map(|i| i as i16).collect();
        write_samples(&values)
    }

    fn constant_buffer(samples: usize, value: i16) -> Vec<u8> {
        write_samples(&vec![value; samples])
    }

    #[test]
    fn test_decimate_one_frame() {
        let input = indexed_buffer(480);
        let output = resample(&input, ResampleAlgorithm::Decimate, 24000, 16000).unwrap();

        assert_eq!(output.len(), 640);
        let samples = read_samples(&output);
        assert_eq!(samples.len(), 320);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[1], 2);
        assert_eq!(samples[2], 3);
        assert_eq!(samples[3], 5);
        assert_eq!(samples[319], 479);
    }

    #[test]
    fn test_decimate_output_matches_index_rule() {
        let input = indexed_buffer(300);
        let samples = read_samples(
            &resample(&input, ResampleAlgorithm::Decimate, 24000, 16000).unwrap(),
        );
        for (j, value) in samples.iter().enumerate() {
            let expected = (j / 2) * 3 + (j % 2) * 2;
            assert_eq!(*value as usize, expected, "sample {j}");
        }
    }

    #[test]
    fn test_decimate_length_not_multiple_of_three() {
        for n in [1usize, 2, 4, 5, 7, 100] {
            let output =
                resample(&indexed_buffer(n), ResampleAlgorithm::Decimate, 24000, 16000).unwrap();
            assert_eq!(output.len(), (n * 2 / 3) * 2, "n = {n}");
        }
    }

    #[test]
    fn test_odd_length_is_rejected() {
        let err = resample(&[0u8; 951], ResampleAlgorithm::Decimate, 24000, 16000).unwrap_err();
        assert_eq!(err, AudioError::InvalidBufferLength(951));

        let err = resample(&[0u8; 3], ResampleAlgorithm::Linear, 24000, 16000).unwrap_err();
        assert_eq!(err, AudioError::InvalidBufferLength(3));
    }

    #[test]
    fn test_decimate_rejects_other_ratios() {
        let err = resample(&[0u8; 4], ResampleAlgorithm::Decimate, 48000, 16000).unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedRatio { .. }));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let err = resample(&[0u8; 4], ResampleAlgorithm::Linear, 0, 16000).unwrap_err();
        assert!(matches!(err, AudioError::InvalidSampleRate { .. }));
    }

    #[test]
    fn test_linear_constant_buffer() {
        let input = constant_buffer(480, 1234);
        let output = resample(&input, ResampleAlgorithm::Linear, 24000, 16000).unwrap();
        let samples = read_samples(&output);
        assert_eq!(samples.len(), 320);
        assert!(samples.iter().all(|s| *s == 1234));
    }

    #[test]
    fn test_linear_length_formula() {
        let cases = [(24000, 16000, 480, 320), (16000, 24000, 320, 480), (44100, 16000, 441, 160), (8000, 16000, 3, 6)];
        for (src, dst, n, expected) in cases {
            let output = resample(&indexed_buffer(n), ResampleAlgorithm::Linear, src, dst).unwrap();
            assert_eq!(output.len(), expected * 2, "{src}->{dst}");
        }
    }

    #[test]
    fn test_linear_interpolates_midpoints() {
        // Upsampling 1:2 places a sample halfway between each input pair.
        let input = write_samples(&[0, 100, 200]);
        let samples = read_samples(&resample(&input, ResampleAlgorithm::Linear, 8000, 16000).unwrap());
        assert_eq!(samples, vec![0, 50, 100, 150, 200, 200]);
    }

    #[test]
    fn test_linear_clips_to_i16_range() {
        let input = write_samples(&[i16::MAX, i16::MAX, i16::MIN, i16::MIN]);
        let samples = read_samples(&resample(&input, ResampleAlgorithm::Linear, 16000, 24000).unwrap());
        assert_eq!(samples[0], i16::MAX);
        assert_eq!(*samples.last().unwrap(), i16::MIN);
    }

    #[test]
    fn test_same_rate_is_identity() {
        let input = indexed_buffer(10);
        for algorithm in [ResampleAlgorithm::Decimate, ResampleAlgorithm::Linear] {
            assert_eq!(resample(&input, algorithm, 16000, 16000).unwrap(), input);
        }
    }

    #[test]
    fn test_empty_input() {
        for algorithm in [ResampleAlgorithm::Decimate, ResampleAlgorithm::Linear] {
            assert!(resample(&[], algorithm, 24000, 16000).unwrap().is_empty());
        }
    }

    #[test]
    fn test_deterministic() {
        let input = indexed_buffer(999);
        let a = resample(&input, ResampleAlgorithm::Linear, 24000, 16000).unwrap();
        let b = resample(&input, ResampleAlgorithm::Linear, 24000, 16000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resampler_struct() {
        let resampler = Resampler::new(ResampleAlgorithm::Decimate, 24000, 16000).unwrap();
        assert_eq!(resampler.process(&indexed_buffer(3)).unwrap().len(), 4);
        assert!(Resampler::new(ResampleAlgorithm::Decimate, 22050, 16000).is_err());
        assert!(Resampler::new(ResampleAlgorithm::Linear, 22050, 16000).is_ok());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!(ResampleAlgorithm::from_str_or_default("LINEAR"), ResampleAlgorithm::Linear);
        assert_eq!(ResampleAlgorithm::from_str_or_default("decimate"), ResampleAlgorithm::Decimate);
        assert_eq!(ResampleAlgorithm::from_str_or_default("bogus"), ResampleAlgorithm::Decimate);
        assert_eq!(ResampleAlgorithm::Linear.to_string(), "linear");
    }
}
