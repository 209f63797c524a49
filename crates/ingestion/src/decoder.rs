//! Packet decoder and encoder
//!
//! A [`DecodeLayout`] is compiled once into a list of slots with precomputed
//! byte offsets; decoding is then a bounds check followed by fixed-offset
//! little-endian reads.

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{DecodeLayout, FieldKind, Sample, SampleField};

use crate::error::{IngestionError, Result};

#[derive(Debug, Clone, Copy)]
struct Slot {
    field: SampleField,
    kind: FieldKind,
    offset: usize,
    scale: f64,
}

fn compile(layout: &DecodeLayout) -> Result<(Vec<Slot>, usize)> {
    layout.validate()?;

    let mut offset = 0;
    let slots = layout
        .fields
        .iter()
        .map(|spec| {
            let slot = Slot {
                field: spec.name,
                kind: spec.kind,
                offset,
                scale: spec.scale,
            };
            offset += spec.kind.width();
            slot
        })
        .collect();

    Ok((slots, offset))
}

/// Stateless payload decoder for one fixed layout
#[derive(Debug, Clone)]
pub struct PacketDecoder {
    slots: Vec<Slot>,
    min_len: usize,
}

impl PacketDecoder {
    /// Compile `layout`; fails if it does not describe a complete sample
    pub fn new(layout: &DecodeLayout) -> Result<Self> {
        let (slots, min_len) = compile(layout)?;
        Ok(Self { slots, min_len })
    }

    /// Minimum payload length accepted
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Decode one payload stamped with `timestamp`
    ///
    /// Bytes beyond the layout are ignored. Shorter payloads fail with
    /// [`IngestionError::MalformedPacket`] and nothing is decoded.
    pub fn decode(&self, payload: &[u8], timestamp: f64) -> Result<Sample> {
        if payload.len() < self.min_len {
            return Err(IngestionError::malformed(self.min_len, payload.len()));
        }

        let mut sample = Sample {
            timestamp,
            seq: 0,
            ax: 0.0,
            ay: 0.0,
            az: 0.0,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
        };

        for slot in &self.slots {
            let raw = read_raw(slot.kind, &payload[slot.offset..slot.offset + slot.kind.width()]);
            match slot.field {
                // Layout validation restricts seq to u8/u16
                SampleField::Seq => sample.seq = raw as u16,
                SampleField::Ax => sample.ax = raw as f64 * slot.scale,
                SampleField::Ay => sample.ay = raw as f64 * slot.scale,
                SampleField::Az => sample.az = raw as f64 * slot.scale,
                SampleField::Gx => sample.gx = raw as f64 * slot.scale,
                SampleField::Gy => sample.gy = raw as f64 * slot.scale,
                SampleField::Gz => sample.gz = raw as f64 * slot.scale,
            }
        }

        Ok(sample)
    }
}

#[inline]
fn read_raw(kind: FieldKind, b: &[u8]) -> i64 {
    match kind {
        FieldKind::U8 => b[0] as i64,
        FieldKind::I8 => b[0] as i8 as i64,
        FieldKind::U16 => u16::from_le_bytes([b[0], b[1]]) as i64,
        FieldKind::I16 => i16::from_le_bytes([b[0], b[1]]) as i64,
        FieldKind::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
        FieldKind::I32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
    }
}

/// Inverse of [`PacketDecoder`] for the same layout
///
/// Used by the simulated device and tests. Counts outside a field's range
/// saturate.
#[derive(Debug, Clone)]
pub struct PacketEncoder {
    slots: Vec<Slot>,
    len: usize,
}

impl PacketEncoder {
    pub fn new(layout: &DecodeLayout) -> Result<Self> {
        let (slots, len) = compile(layout)?;
        Ok(Self { slots, len })
    }

    /// Encode raw integer counts
    ///
    /// `counts` is ordered like [`SampleField::CHANNELS`] (ax, ay, az, gx, gy, gz).
    pub fn encode_counts(&self, seq: u16, counts: [i64; 6]) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len);
        for slot in &self.slots {
            let raw = match slot.field {
                SampleField::Seq => seq as i64,
                other => SampleField::CHANNELS
                    .iter()
                    .position(|c| *c == other)
                    .map(|idx| counts[idx])
                    .unwrap_or_default(),
            };
            write_raw(&mut buf, slot.kind, raw);
        }
        buf.freeze()
    }

    /// Encode physical values, rounding each to the nearest count
    pub fn encode_sample(&self, sample: &Sample) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len);
        for slot in &self.slots {
            let raw = match slot.field {
                SampleField::Seq => sample.seq as i64,
                field => to_count(sample.field(field), slot.scale),
            };
            write_raw(&mut buf, slot.kind, raw);
        }
        buf.freeze()
    }
}

fn to_count(value: f64, scale: f64) -> i64 {
    let count = (value / scale).round();
    if count.is_nan() {
        0
    } else {
        // `as` saturates for out-of-range floats
        count as i64
    }
}

fn write_raw(buf: &mut BytesMut, kind: FieldKind, raw: i64) {
    let (lo, hi) = kind.range();
    let v = raw.clamp(lo, hi);
    match kind {
        FieldKind::U8 => buf.put_u8(v as u8),
        FieldKind::I8 => buf.put_i8(v as i8),
        FieldKind::U16 => buf.put_u16_le(v as u16),
        FieldKind::I16 => buf.put_i16_le(v as i16),
        FieldKind::U32 => buf.put_u32_le(v as u32),
        FieldKind::I32 => buf.put_i32_le(v as i32),
    }
}
