//! Sample collections and their per-bit-position planes.
//!
//! Bit ordering is fixed for the whole crate: bit index `i` of a sample is
//! bit `i % 8` (least significant first) of byte `i / 8`. Bit 0 is therefore
//! the LSB of the first byte.

use crate::error::{Result, TestError};

/// An ordered, validated collection of equal-length samples.
///
/// Samples are packed back to back in a single buffer; every sample spans
/// [`SampleSet::bytes_per_sample`] bytes of which the first
/// [`SampleSet::bits_per_sample`] bits are significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSet {
    data: Vec<u8>,
    bytes_per_sample: usize,
    bits_per_sample: usize,
    len: usize,
}

impl SampleSet {
    /// Build from byte samples; every bit of every byte is significant.
    ///
    /// # Errors
    /// `InvalidArgument` if the collection is empty, a sample is empty, or
    /// the samples differ in length.
    pub fn from_samples<I, S>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let (data, width, len) = pack(samples, None)?;
        Ok(Self {
            data,
            bytes_per_sample: width,
            bits_per_sample: width * 8,
            len,
        })
    }

    /// Build from samples holding `bits` significant bits each.
    ///
    /// Every sample must be exactly `ceil(bits / 8)` bytes; bits past `bits`
    /// in the last byte are ignored.
    pub fn with_bit_length<I, S>(samples: I, bits: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        if bits == 0 {
            return Err(TestError::invalid("bit length must be at least 1"));
        }
        let (data, width, len) = pack(samples, Some(bits.div_ceil(8)))?;
        Ok(Self {
            data,
            bytes_per_sample: width,
            bits_per_sample: bits,
            len,
        })
    }

    /// Parse a string of `'0'`/`'1'` characters, each one a single-bit sample.
    /// ASCII whitespace is skipped.
    pub fn from_ascii_bits(text: &str) -> Result<Self> {
        let mut data = Vec::with_capacity(text.len());
        for (pos, ch) in text.chars().enumerate() {
            match ch {
                '0' => data.push(0),
                '1' => data.push(1),
                c if c.is_ascii_whitespace() => {}
                c => {
                    return Err(TestError::invalid(format!(
                        "unexpected character {c:?} at position {pos}, expected '0' or '1'"
                    )));
                }
            }
        }
        if data.is_empty() {
            return Err(TestError::invalid("sample collection is empty"));
        }
        let len = data.len();
        Ok(Self {
            data,
            bytes_per_sample: 1,
            bits_per_sample: 1,
            len,
        })
    }

    /// Number of samples (N).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: construction rejects empty collections.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Significant bits per sample (B).
    pub fn bits_per_sample(&self) -> usize {
        self.bits_per_sample
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    /// Raw bytes of sample `index`, or `None` past the end.
    pub fn sample(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let start = index * self.bytes_per_sample;
        Some(&self.data[start..start + self.bytes_per_sample])
    }

    /// Iterate over the samples in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.data.chunks_exact(self.bytes_per_sample)
    }
}

fn pack<I, S>(samples: I, expected_width: Option<usize>) -> Result<(Vec<u8>, usize, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut data = Vec::new();
    let mut width = expected_width;
    let mut len = 0usize;
    for (index, sample) in samples.into_iter().enumerate() {
        let bytes = sample.as_ref();
        let w = *width.get_or_insert(bytes.len());
        if w == 0 {
            return Err(TestError::invalid("samples must contain at least one byte"));
        }
        if bytes.len() != w {
            return Err(TestError::invalid(format!(
                "sample {index} has {} bytes, expected {w}",
                bytes.len()
            )));
        }
        data.extend_from_slice(bytes);
        len += 1;
    }
    match (len, width) {
        (0, _) | (_, None) => Err(TestError::invalid("sample collection is empty")),
        (len, Some(w)) => Ok((data, w, len)),
    }
}

/// Arena of bit planes: `B` planes of `N` values (0 or 1), plane-major.
///
/// Built once from a [`SampleSet`] and read-only afterwards, so every test
/// and every bit index reads the same layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitPlanes {
    bits: Vec<u8>,
    sample_count: usize,
    plane_count: usize,
}

impl BitPlanes {
    /// Reindex `samples` into one plane per bit position. O(N·B).
    pub fn extract(samples: &SampleSet) -> Self {
        let n = samples.len();
        let b = samples.bits_per_sample();
        let mut bits = vec![0u8; n * b];
        for (s, sample) in samples.iter().enumerate() {
            for bit in 0..b {
                bits[bit * n + s] = (sample[bit / 8] >> (bit % 8)) & 1;
            }
        }
        Self {
            bits,
            sample_count: n,
            plane_count: b,
        }
    }

    /// Number of planes (B).
    pub fn len(&self) -> usize {
        self.plane_count
    }

    pub fn is_empty(&self) -> bool {
        self.plane_count == 0
    }

    /// Length of every plane (N).
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Plane for bit index `bit`.
    ///
    /// # Panics
    /// If `bit >= self.len()`.
    pub fn plane(&self, bit: usize) -> &[u8] {
        assert!(bit < self.plane_count, "bit index {bit} out of range");
        let start = bit * self.sample_count;
        &self.bits[start..start + self.sample_count]
    }

    /// Iterate over the planes in bit-index order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.bits.chunks_exact(self.sample_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_bit_zero_is_lsb_of_first_byte() {
        let samples = SampleSet::from_samples([[0b0000_0001u8, 0b1000_0000], [0b0000_0010, 0]]).unwrap();
        let planes = BitPlanes::extract(&samples);
        assert_eq!(planes.len(), 16);
        assert_eq!(planes.sample_count(), 2);
        assert_eq!(planes.plane(0), &[1, 0]);
        assert_eq!(planes.plane(1), &[0, 1]);
        assert_eq!(planes.plane(15), &[1, 0]);
        assert_eq!(planes.plane(8), &[0, 0]);
    }

    #[test]
    fn test_planes_preserve_collection_order() {
        let samples = SampleSet::from_samples([[1u8], [0], [1], [1], [0]]).unwrap();
        let planes = BitPlanes::extract(&samples);
        assert_eq!(planes.plane(0), &[1, 0, 1, 1, 0]);
        assert_eq!(planes.iter().count(), 8);
        assert!(planes.iter().all(|p| p.len() == 5));
    }

    #[test]
    fn test_empty_collection_rejected() {
        let empty: Vec<Vec<u8>> = Vec::new();
        let err = SampleSet::from_samples(empty).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(SampleSet::from_ascii_bits("  \n").is_err());
    }

    #[test]
    fn test_zero_width_samples_rejected() {
        let err = SampleSet::from_samples([Vec::<u8>::new()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_mismatched_lengths_name_the_sample() {
        let err = SampleSet::from_samples([vec![1u8, 2], vec![3, 4], vec![5]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("sample 2"), "{err}");
    }

    #[test]
    fn test_with_bit_length_ignores_padding_bits() {
        let samples = SampleSet::with_bit_length([[0xFFu8, 0xFF], [0x00, 0x00]], 12).unwrap();
        assert_eq!(samples.bits_per_sample(), 12);
        assert_eq!(samples.bytes_per_sample(), 2);
        let planes = BitPlanes::extract(&samples);
        assert_eq!(planes.len(), 12);
        assert_eq!(planes.plane(11), &[1, 0]);
    }

    #[test]
    fn test_with_bit_length_checks_width() {
        assert!(SampleSet::with_bit_length([[0u8; 2]], 8).is_err());
        assert!(SampleSet::with_bit_length([[0u8; 1]], 0).is_err());
        assert!(SampleSet::with_bit_length([[0u8; 1]], 1).is_ok());
    }

    #[test]
    fn test_ascii_bits_are_single_bit_samples() {
        let samples = SampleSet::from_ascii_bits("1011 0\n1").unwrap();
        assert_eq!(samples.len(), 6);
        assert_eq!(samples.bits_per_sample(), 1);
        let planes = BitPlanes::extract(&samples);
        assert_eq!(planes.len(), 1);
        assert_eq!(planes.plane(0), &[1, 0, 1, 1, 0, 1]);
    }

    #[test]
    fn test_ascii_bits_reject_other_characters() {
        let err = SampleSet::from_ascii_bits("10x1").unwrap_err();
        assert!(err.to_string().contains("position 2"), "{err}");
    }

    #[test]
    fn test_sample_accessor() {
        let samples = SampleSet::from_samples([[1u8, 2], [3, 4]]).unwrap();
        assert_eq!(samples.sample(1), Some(&[3u8, 4][..]));
        assert_eq!(samples.sample(2), None);
        assert_eq!(samples.len(), 2);
        assert!(!samples.is_empty());
    }
}
