//! CSV Eligibility Source
//!
//! One recipient per line: `address,amount`. The address is 40 hex chars
//! (optional `0x`), the amount a decimal integer up to 2^256 - 1 (or `0x`
//! hex). An `address,amount` header, blank lines and `#` comments are
//! skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::core::encoding::EncodingError;
use crate::core::recipient::{Entitlement, Identity, Recipient};

/// Errors raised while reading a recipient list.
#[derive(Debug, Error)]
pub enum EligibilityError {
    /// Underlying read failed.
    #[error("failed to read recipients: {0}")]
    Io(#[from] io::Error),

    /// A field on the line could not be parsed.
    #[error("line {line}: {source}")]
    Line {
        /// 1-based line number.
        line: usize,
        /// Cause.
        #[source]
        source: EncodingError,
    },

    /// The line does not have the `address,amount` shape.
    #[error("line {line}: {reason}")]
    Format {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

/// Read recipients in file order. Ordering and duplicate checks happen
/// when the distribution is built.
pub fn read_recipients<R: BufRead>(reader: R) -> Result<Vec<Recipient>, EligibilityError> {
    let mut recipients = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if recipients.is_empty() && is_header(trimmed) {
            continue;
        }
        recipients.push(parse_line(trimmed, line_no)?);
    }

    debug!(recipients = recipients.len(), "read eligibility list");
    Ok(recipients)
}

/// Open `path` and read recipients from it.
pub fn read_recipients_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<Recipient>, EligibilityError> {
    let file = File::open(path.as_ref())?;
    read_recipients(BufReader::new(file))
}

fn is_header(line: &str) -> bool {
    let mut fields = line.split(',').map(str::trim);
    matches!(
        (fields.next(), fields.next(), fields.next()),
        (Some(a), Some(b), None)
            if a.eq_ignore_ascii_case("address") && b.eq_ignore_ascii_case("amount")
    )
}

fn parse_line(line: &str, line_no: usize) -> Result<Recipient, EligibilityError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [address, amount] = fields.as_slice() else {
        return Err(EligibilityError::Format {
            line: line_no,
            reason: format!("expected 2 fields, got {}", fields.len()),
        });
    };

    let at_line = |source| EligibilityError::Line { line: line_no, source };
    let identity: Identity = address.parse().map_err(at_line)?;
    let entitlement: Entitlement = amount.parse().map_err(at_line)?;
    Ok(Recipient::new(identity, entitlement))
}
