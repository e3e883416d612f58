//! Recipient Records and Leaf Encoding
//!
//! A recipient is a 20-byte identity (an account address) and a 256-bit
//! entitlement. Its leaf is
//!
//! ```text
//! Hash(0x00 ‖ identity[20] ‖ entitlement[32, big-endian])
//! ```

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::encoding::{EncodingError, LeafSchema};
use super::hash::{Digest, MerkleHasher};

/// Identity width in bytes.
pub const IDENTITY_LEN: usize = 20;

/// Entitlement width in bytes (uint256).
pub const ENTITLEMENT_LEN: usize = 32;

/// Encoded recipient width.
pub const RECIPIENT_LEN: usize = IDENTITY_LEN + ENTITLEMENT_LEN;

/// 20-byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(pub [u8; IDENTITY_LEN]);

impl Identity {
    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// True for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Identity {
    type Err = EncodingError;

    /// Parse a 40-char hex address, with or without `0x`. The zero address
    /// is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if cleaned.len() != IDENTITY_LEN * 2 {
            return Err(EncodingError::InvalidHex {
                field: "identity",
                reason: format!("expected 40 hex chars, got {}", cleaned.len()),
            });
        }
        let mut bytes = [0u8; IDENTITY_LEN];
        hex::decode_to_slice(cleaned, &mut bytes).map_err(|e| EncodingError::InvalidHex {
            field: "identity",
            reason: e.to_string(),
        })?;
        let identity = Identity(bytes);
        if identity.is_zero() {
            return Err(EncodingError::ZeroIdentity);
        }
        Ok(identity)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            struct AddressVisitor;

            impl Visitor<'_> for AddressVisitor {
                type Value = Identity;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a 20-byte hex address")
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Identity, E> {
                    v.parse().map_err(E::custom)
                }
            }

            deserializer.deserialize_str(AddressVisitor)
        } else {
            <[u8; IDENTITY_LEN]>::deserialize(deserializer).map(Identity)
        }
    }
}

/// Unsigned 256-bit entitlement, stored big-endian.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Entitlement(pub [u8; ENTITLEMENT_LEN]);

impl Entitlement {
    /// Zero.
    pub const ZERO: Entitlement = Entitlement([0u8; ENTITLEMENT_LEN]);

    /// Build from big-endian bytes of any length.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let schema = LeafSchema::new(vec![super::encoding::FieldSpec::new(
            "entitlement",
            ENTITLEMENT_LEN,
        )]);
        let padded = schema.encode(&[bytes])?;
        let mut out = [0u8; ENTITLEMENT_LEN];
        out.copy_from_slice(&padded);
        Ok(Self(out))
    }

    /// Big-endian bytes.
    pub fn to_be_bytes(&self) -> [u8; ENTITLEMENT_LEN] {
        self.0
    }

    /// True when zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ENTITLEMENT_LEN]
    }

    /// Multiply in place by a small factor and add a small term.
    /// Returns false on overflow.
    fn mul_add_small(&mut self, factor: u32, term: u32) -> bool {
        let mut carry = term as u64;
        for byte in self.0.iter_mut().rev() {
            let v = (*byte as u64) * factor as u64 + carry;
            *byte = v as u8;
            carry = v >> 8;
        }
        carry == 0
    }

    /// Divide in place by a small divisor, returning the remainder.
    fn div_rem_small(&mut self, divisor: u32) -> u32 {
        let mut rem = 0u64;
        for byte in self.0.iter_mut() {
            let cur = (rem << 8) | *byte as u64;
            *byte = (cur / divisor as u64) as u8;
            rem = cur % divisor as u64;
        }
        rem as u32
    }
}

impl From<u64> for Entitlement {
    fn from(value: u64) -> Self {
        let mut out = [0u8; ENTITLEMENT_LEN];
        out[ENTITLEMENT_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }
}

impl From<u128> for Entitlement {
    fn from(value: u128) -> Self {
        let mut out = [0u8; ENTITLEMENT_LEN];
        out[ENTITLEMENT_LEN - 16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }
}

impl FromStr for Entitlement {
    type Err = EncodingError;

    /// Parse a decimal integer, or hex when prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || EncodingError::InvalidDecimal {
            field: "entitlement",
            value: trimmed.to_string(),
        };

        if let Some(hex_digits) = trimmed.strip_prefix("0x") {
            if hex_digits.is_empty() {
                return Err(invalid());
            }
            let padded = if hex_digits.len() % 2 == 1 {
                format!("0{}", hex_digits)
            } else {
                hex_digits.to_string()
            };
            let bytes = hex::decode(&padded).map_err(|e| EncodingError::InvalidHex {
                field: "entitlement",
                reason: e.to_string(),
            })?;
            return Self::from_be_slice(&bytes);
        }

        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let mut value = Entitlement::ZERO;
        for b in trimmed.bytes() {
            if !value.mul_add_small(10, (b - b'0') as u32) {
                return Err(EncodingError::FieldOverflow {
                    field: "entitlement",
                    width: ENTITLEMENT_LEN,
                    len: ENTITLEMENT_LEN + 1,
                });
            }
        }
        Ok(value)
    }
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let mut value = *self;
        let mut digits = Vec::with_capacity(78);
        while !value.is_zero() {
            let rem = value.div_rem_small(10);
            digits.push(b'0' + rem as u8);
        }
        digits.reverse();
        // Digits are ASCII.
        f.write_str(&String::from_utf8_lossy(&digits))
    }
}

impl fmt::Debug for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entitlement({})", self)
    }
}

impl Serialize for Entitlement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Entitlement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        } else {
            <[u8; ENTITLEMENT_LEN]>::deserialize(deserializer).map(Entitlement)
        }
    }
}

/// One eligible recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    /// Account identity.
    #[serde(rename = "address")]
    pub identity: Identity,
    /// Amount the account may claim.
    #[serde(rename = "amount")]
    pub entitlement: Entitlement,
}

impl Recipient {
    /// Create a recipient.
    pub fn new(identity: Identity, entitlement: impl Into<Entitlement>) -> Self {
        Self {
            identity,
            entitlement: entitlement.into(),
        }
    }

    /// Fixed-width payload: identity then entitlement.
    pub fn encode(&self) -> [u8; RECIPIENT_LEN] {
        let mut out = [0u8; RECIPIENT_LEN];
        out[..IDENTITY_LEN].copy_from_slice(&self.identity.0);
        out[IDENTITY_LEN..].copy_from_slice(&self.entitlement.0);
        out
    }

    /// Inverse of [`Recipient::encode`].
    pub fn decode(bytes: &[u8; RECIPIENT_LEN]) -> Self {
        let mut identity = [0u8; IDENTITY_LEN];
        identity.copy_from_slice(&bytes[..IDENTITY_LEN]);
        let mut entitlement = [0u8; ENTITLEMENT_LEN];
        entitlement.copy_from_slice(&bytes[IDENTITY_LEN..]);
        Self {
            identity: Identity(identity),
            entitlement: Entitlement(entitlement),
        }
    }
}

/// Encode a recipient into its leaf digest.
pub fn encode_leaf<H: MerkleHasher + ?Sized>(hasher: &H, recipient: &Recipient) -> Digest {
    hasher.hash_leaf(&recipient.encode())
}

/// Encode an arbitrary record against a schema and hash it as a leaf.
///
/// Fails if any value overflows its field.
pub fn encode_record<H: MerkleHasher + ?Sized>(
    hasher: &H,
    schema: &LeafSchema,
    values: &[&[u8]],
) -> Result<Digest, EncodingError> {
    let payload = schema.encode(values)?;
    Ok(hasher.hash_leaf(&payload))
}
