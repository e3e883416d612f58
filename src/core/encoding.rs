//! Fixed-Width Leaf Encoding
//!
//! A leaf payload is the concatenation of a fixed, ordered list of fields,
//! each left-padded with zeros to its declared width. There are no length
//! prefixes and no separators: every schema has exactly one encoded length,
//! so two different records can never produce the same payload.

use thiserror::Error;

/// Errors raised while encoding a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// A value has more significant bytes than its field allows.
    #[error("field '{field}' overflows {width} bytes (value has {len} significant bytes)")]
    FieldOverflow {
        /// Field name.
        field: &'static str,
        /// Declared width.
        width: usize,
        /// Significant bytes in the offending value.
        len: usize,
    },

    /// Wrong number of values for the schema.
    #[error("schema expects {expected} fields, got {got}")]
    FieldCount {
        /// Fields declared by the schema.
        expected: usize,
        /// Values supplied.
        got: usize,
    },

    /// A hex value has the wrong length or characters.
    #[error("field '{field}' is not valid hex: {reason}")]
    InvalidHex {
        /// Field name.
        field: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// A decimal value could not be parsed.
    #[error("field '{field}' is not a decimal integer: '{value}'")]
    InvalidDecimal {
        /// Field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// The all-zero identity cannot receive anything.
    #[error("zero identity not allowed")]
    ZeroIdentity,
}

/// One field of a leaf schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name used in error messages.
    pub name: &'static str,
    /// Encoded width in bytes.
    pub width: usize,
}

impl FieldSpec {
    /// Declare a field.
    pub const fn new(name: &'static str, width: usize) -> Self {
        Self { name, width }
    }
}

/// Ordered tuple of fixed-width fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSchema {
    fields: Vec<FieldSpec>,
}

impl LeafSchema {
    /// Build a schema from its fields, in encoding order.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// The airdrop recipient schema: 20-byte identity then 32-byte entitlement.
    pub fn recipient() -> Self {
        Self::new(vec![
            FieldSpec::new("identity", crate::core::recipient::IDENTITY_LEN),
            FieldSpec::new("entitlement", crate::core::recipient::ENTITLEMENT_LEN),
        ])
    }

    /// Declared fields.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(|f| f.width).sum()
    }

    /// Encode big-endian values, left-padding each to its field width.
    ///
    /// Leading zero bytes beyond the width are tolerated; any significant
    /// byte that does not fit is an overflow.
    pub fn encode(&self, values: &[&[u8]]) -> Result<Vec<u8>, EncodingError> {
        if values.len() != self.fields.len() {
            return Err(EncodingError::FieldCount {
                expected: self.fields.len(),
                got: values.len(),
            });
        }

        let mut out = Vec::with_capacity(self.encoded_len());
        for (spec, value) in self.fields.iter().zip(values) {
            let first_nonzero = value.iter().position(|b| *b != 0).unwrap_or(value.len());
            let significant = &value[first_nonzero..];
            if significant.len() > spec.width {
                return Err(EncodingError::FieldOverflow {
                    field: spec.name,
                    width: spec.width,
                    len: significant.len(),
                });
            }
            out.resize(out.len() + spec.width - significant.len(), 0);
            out.extend_from_slice(significant);
        }
        Ok(out)
    }
}
