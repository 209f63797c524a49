//! DecodeLayout - packet schema
//!
//! Describes how a raw notification payload maps onto [`Sample`](crate::Sample)
//! fields: order, integer width and signedness, and a linear scale per field.
//! Fields are packed little-endian in declaration order without padding.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{ContractError, SampleField};

/// Raw integer encoding of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl FieldKind {
    /// Encoded width in bytes
    pub fn width(self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 => 4,
        }
    }

    /// Whether the encoding is unsigned
    pub fn is_unsigned(self) -> bool {
        matches!(self, FieldKind::U8 | FieldKind::U16 | FieldKind::U32)
    }

    /// Inclusive range of representable raw counts
    pub fn range(self) -> (i64, i64) {
        match self {
            FieldKind::U8 => (0, u8::MAX as i64),
            FieldKind::I8 => (i8::MIN as i64, i8::MAX as i64),
            FieldKind::U16 => (0, u16::MAX as i64),
            FieldKind::I16 => (i16::MIN as i64, i16::MAX as i64),
            FieldKind::U32 => (0, u32::MAX as i64),
            FieldKind::I32 => (i32::MIN as i64, i32::MAX as i64),
        }
    }
}

/// One field of the packet layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Sample field this slot populates
    pub name: SampleField,

    /// Raw encoding
    pub kind: FieldKind,

    /// Physical value = raw count * scale
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl FieldSpec {
    pub const fn new(name: SampleField, kind: FieldKind, scale: f64) -> Self {
        Self { name, kind, scale }
    }
}

/// Packet layout (configuration, fixed for a run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeLayout {
    /// Fields in wire order
    pub fields: Vec<FieldSpec>,
}

/// Acceleration counts are milli-g
pub const ACCEL_SCALE: f64 = 1.0 / 1000.0;

/// Angular-rate counts are centi-deg/s
pub const GYRO_SCALE: f64 = 1.0 / 100.0;

impl Default for DecodeLayout {
    /// `uint16 seq` followed by six `int16` motion fields (14 bytes)
    fn default() -> Self {
        Self {
            fields: vec![
                FieldSpec::new(SampleField::Seq, FieldKind::U16, 1.0),
                FieldSpec::new(SampleField::Ax, FieldKind::I16, ACCEL_SCALE),
                FieldSpec::new(SampleField::Ay, FieldKind::I16, ACCEL_SCALE),
                FieldSpec::new(SampleField::Az, FieldKind::I16, ACCEL_SCALE),
                FieldSpec::new(SampleField::Gx, FieldKind::I16, GYRO_SCALE),
                FieldSpec::new(SampleField::Gy, FieldKind::I16, GYRO_SCALE),
                FieldSpec::new(SampleField::Gz, FieldKind::I16, GYRO_SCALE),
            ],
        }
    }
}

impl DecodeLayout {
    /// Minimum payload length implied by the layout
    pub fn byte_len(&self) -> usize {
        self.fields.iter().map(|f| f.kind.width()).sum()
    }

    /// Check that the layout fully describes a [`Sample`](crate::Sample)
    ///
    /// Every field must appear exactly once, `seq` must be an unsigned kind no
    /// wider than 16 bits with unit scale, and all scales must be finite and non-zero.
    pub fn validate(&self) -> Result<(), ContractError> {
        let mut seen = HashSet::new();
        for (idx, spec) in self.fields.iter().enumerate() {
            if !seen.insert(spec.name) {
                return Err(ContractError::config_validation(
                    format!("decode.fields[{idx}].name"),
                    format!("duplicate field '{}'", spec.name),
                ));
            }
            if !spec.scale.is_finite() || spec.scale == 0.0 {
                return Err(ContractError::config_validation(
                    format!("decode.fields[{idx}].scale"),
                    format!("scale must be finite and non-zero, got {}", spec.scale),
                ));
            }
            if spec.name == SampleField::Seq {
                if !matches!(spec.kind, FieldKind::U8 | FieldKind::U16) {
                    return Err(ContractError::config_validation(
                        format!("decode.fields[{idx}].kind"),
                        format!("seq must be u8 or u16, got {:?}", spec.kind),
                    ));
                }
                if spec.scale != 1.0 {
                    return Err(ContractError::config_validation(
                        format!("decode.fields[{idx}].scale"),
                        "seq is a counter and must use scale 1",
                    ));
                }
            }
        }

        for field in SampleField::ALL {
            if !seen.contains(&field) {
                return Err(ContractError::config_validation(
                    "decode.fields",
                    format!("missing field '{field}'"),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_14_bytes() {
        let layout = DecodeLayout::default();
        assert_eq!(layout.byte_len(), 14);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut layout = DecodeLayout::default();
        layout.fields.retain(|f| f.name != SampleField::Gz);
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("missing field 'gz'"));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut layout = DecodeLayout::default();
        layout.fields.push(FieldSpec::new(SampleField::Ax, FieldKind::I16, 1.0));
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_signed_seq_rejected() {
        let mut layout = DecodeLayout::default();
        layout.fields[0].kind = FieldKind::I16;
        assert!(matches!(
            layout.validate(),
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_layout_from_json() {
        let json = r#"{ "fields": [
            { "name": "seq", "kind": "u16" },
            { "name": "gx", "kind": "i32", "scale": 0.001 },
            { "name": "gy", "kind": "i32", "scale": 0.001 },
            { "name": "gz", "kind": "i32", "scale": 0.001 },
            { "name": "ax", "kind": "i16", "scale": 0.001 },
            { "name": "ay", "kind": "i16", "scale": 0.001 },
            { "name": "az", "kind": "i16", "scale": 0.001 }
        ] }"#;
        let layout: DecodeLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.byte_len(), 2 + 12 + 6);
        assert_eq!(layout.fields[0].scale, 1.0);
        assert!(layout.validate().is_ok());
    }
}
