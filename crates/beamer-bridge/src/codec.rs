//! Binary frame codec for engine-to-UI telemetry.
//!
//! Every binary payload the engine sends is a little-endian frame decoded
//! through one [`FrameReader`]:
//!
//! ```text
//! Meter frame:        [12-byte header][f32 L peak][f32 L rms][f32 R peak][f32 R rms]
//! Sample-buffer frame:[12-byte header][f32 sample]...
//! State-dump frame:   [u16 count]([u16 parameter id][f32 value]) * count
//! ```
//!
//! The header of meter and sample-buffer frames is opaque and skipped.
//! Outbound messages are scalar tuples and need no framing; see
//! [`OutboundMessage`](crate::transport::OutboundMessage).

use std::fmt;

use beamer_bridge_core::ParameterId;

use crate::telemetry::meter::{Channel, MeterReading};

/// Size of the opaque header in meter and sample-buffer frames.
pub const FRAME_HEADER_SIZE: usize = 12;

/// Size of a meter frame.
pub const METER_FRAME_SIZE: usize = FRAME_HEADER_SIZE + 4 * 4;

/// Size of one state-dump entry (u16 id + f32 value).
pub const STATE_ENTRY_SIZE: usize = 6;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while reading a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A read needed more bytes than the frame has left.
    Truncated {
        /// Byte offset of the failed read.
        offset: usize,
        /// Bytes the read needed.
        needed: usize,
        /// Total frame length.
        len: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                offset,
                needed,
                len,
            } => write!(
                f,
                "Truncated frame: needed {} bytes at offset {}, frame is {} bytes",
                needed, offset, len
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// Result type for frame decoding.
pub type FrameResult<T> = Result<T, FrameError>;

// =============================================================================
// FrameReader
// =============================================================================

/// Cursor over a little-endian frame.
#[derive(Debug, Clone)]
pub struct FrameReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FrameReader<'a> {
    /// Start reading at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Start reading after the fixed frame header.
    pub fn after_header(data: &'a [u8]) -> FrameResult<Self> {
        let mut reader = Self::new(data);
        reader.skip(FRAME_HEADER_SIZE)?;
        Ok(reader)
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Advance without reading.
    pub fn skip(&mut self, count: usize) -> FrameResult<()> {
        self.take(count).map(|_| ())
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> FrameResult<u16> {
        self.take_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian f32.
    pub fn read_f32(&mut self) -> FrameResult<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    fn take_array<const N: usize>(&mut self) -> FrameResult<[u8; N]> {
        let bytes = self.take(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    fn take(&mut self, count: usize) -> FrameResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(FrameError::Truncated {
                offset: self.offset,
                needed: count,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }
}

// =============================================================================
// Meter frames
// =============================================================================

/// Peak/RMS pair for both channels of a stereo meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterFrame {
    pub left_peak: f32,
    pub left_rms: f32,
    pub right_peak: f32,
    pub right_rms: f32,
}

impl MeterFrame {
    /// Decode a meter frame. Bytes past offset 28 are ignored.
    pub fn decode(data: &[u8]) -> FrameResult<Self> {
        let mut reader = FrameReader::after_header(data)?;
        Ok(Self {
            left_peak: reader.read_f32()?,
            left_rms: reader.read_f32()?,
            right_peak: reader.read_f32()?,
            right_rms: reader.read_f32()?,
        })
    }

    /// Encode into a frame with a zeroed header.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; FRAME_HEADER_SIZE];
        for value in [self.left_peak, self.left_rms, self.right_peak, self.right_rms] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    /// Readings per channel, left first.
    pub fn readings(&self) -> [MeterReading; 2] {
        [
            MeterReading::new(Channel::Left, self.left_peak, self.left_rms),
            MeterReading::new(Channel::Right, self.right_peak, self.right_rms),
        ]
    }
}

// =============================================================================
// Sample-buffer frames
// =============================================================================

/// Decode a sample-buffer frame into its samples.
///
/// The sample count is `(len - 12) / 4`; a trailing partial sample is
/// dropped.
pub fn decode_samples(data: &[u8]) -> FrameResult<Vec<f32>> {
    let mut reader = FrameReader::after_header(data)?;
    let count = reader.remaining() / 4;
    if reader.remaining() % 4 != 0 {
        log::debug!(
            "Sample frame has {} trailing bytes, ignoring",
            reader.remaining() % 4
        );
    }
    (0..count).map(|_| reader.read_f32()).collect()
}

/// Encode samples into a frame with a zeroed header.
pub fn encode_samples(samples: &[f32]) -> Vec<u8> {
    let mut data = Vec::with_capacity(FRAME_HEADER_SIZE + samples.len() * 4);
    data.resize(FRAME_HEADER_SIZE, 0);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

// =============================================================================
// State-dump frames
// =============================================================================

/// Full parameter state sent by the engine in reply to a state request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDump {
    /// Decoded `(id, normalized value)` entries, in frame order.
    pub entries: Vec<(ParameterId, f32)>,
    /// Whether the frame ended before the declared count was reached.
    pub truncated: bool,
}

impl StateDump {
    /// Decode a state-dump frame.
    ///
    /// Never fails: a frame whose declared count would read past its end is
    /// logged, and the entries decoded up to that point are returned with
    /// `truncated` set.
    pub fn decode(data: &[u8]) -> Self {
        let mut reader = FrameReader::new(data);
        let declared = match reader.read_u16() {
            Ok(count) => count as usize,
            Err(err) => {
                log::warn!("State dump without entry count: {}", err);
                return Self {
                    entries: Vec::new(),
                    truncated: true,
                };
            }
        };

        let mut entries = Vec::with_capacity(declared.min(reader.remaining() / STATE_ENTRY_SIZE));
        for index in 0..declared {
            let entry = reader
                .read_u16()
                .and_then(|id| reader.read_f32().map(|value| (ParameterId::from(id), value)));
            match entry {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    log::warn!(
                        "State dump truncated at entry {} of {}: {}",
                        index,
                        declared,
                        err
                    );
                    return Self {
                        entries,
                        truncated: true,
                    };
                }
            }
        }

        Self {
            entries,
            truncated: false,
        }
    }

    /// Encode `(id, value)` entries into a state-dump frame.
    ///
    /// Ids above `u16::MAX` are skipped, and at most `u16::MAX` entries are
    /// written.
    pub fn encode(entries: &[(ParameterId, f32)]) -> Vec<u8> {
        let encodable: Vec<(u16, f32)> = entries
            .iter()
            .filter_map(|&(id, value)| u16::try_from(id).ok().map(|id| (id, value)))
            .take(u16::MAX as usize)
            .collect();

        let mut data = Vec::with_capacity(2 + encodable.len() * STATE_ENTRY_SIZE);
        data.extend_from_slice(&(encodable.len() as u16).to_le_bytes());
        for (id, value) in encodable {
            data.extend_from_slice(&id.to_le_bytes());
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }
}
