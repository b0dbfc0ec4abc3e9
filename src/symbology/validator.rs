//! Checksum validation for the supported retail symbologies.
//!
//! All four numeric checks are weighted alternating mod-10 sums; they differ
//! only in length and in which positions carry weight 3. Everything here is
//! pure and deterministic.

use serde::{Deserialize, Serialize};

/// Format as detected from a raw digit string. ISBN-13 is an alias of the
/// EAN-13 checksum rule but is reported under its own tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectedFormat {
    Ean13,
    Ean8,
    UpcA,
    Code128,
    Isbn13,
    Unknown,
}

impl std::fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DetectedFormat::Ean13 => "EAN-13",
            DetectedFormat::Ean8 => "EAN-8",
            DetectedFormat::UpcA => "UPC-A",
            DetectedFormat::Code128 => "Code-128",
            DetectedFormat::Isbn13 => "ISBN-13",
            DetectedFormat::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Structured validation outcome. Never an error: bad input is user-input
/// feedback, not a system fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub format: DetectedFormat,
    /// The canonical digit string on success. ISBN-13 round-trips as itself.
    pub normalized: Option<String>,
    pub reason: Option<String>,
}

impl ValidationResult {
    fn invalid(format: DetectedFormat, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            format,
            normalized: None,
            reason: Some(reason.into()),
        }
    }

    fn valid(format: DetectedFormat, normalized: String) -> Self {
        Self {
            valid: true,
            format,
            normalized: Some(normalized),
            reason: None,
        }
    }
}

/// Validate a raw barcode string: detect the format by length and prefix,
/// then verify its check digit.
pub fn validate(input: &str) -> ValidationResult {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return ValidationResult::invalid(DetectedFormat::Unknown, "Barcode cannot be empty");
    }

    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return ValidationResult::invalid(
            DetectedFormat::Unknown,
            "Barcode must contain only digits",
        );
    }

    let digits: Vec<u32> = trimmed.bytes().map(|b| (b - b'0') as u32).collect();

    match digits.len() {
        8 => check(trimmed, &digits, DetectedFormat::Ean8),
        12 => check(trimmed, &digits, DetectedFormat::UpcA),
        13 => {
            let format = if trimmed.starts_with("978") || trimmed.starts_with("979") {
                DetectedFormat::Isbn13
            } else {
                DetectedFormat::Ean13
            };
            check(trimmed, &digits, format)
        }
        n => ValidationResult::invalid(
            DetectedFormat::Unknown,
            format!("Unsupported barcode length: {} digits", n),
        ),
    }
}

/// Compute the check digit for a payload (all digits except the last).
///
/// `weight_three_even` selects which alternation the symbology uses: EAN-8
/// and UPC-A weight even 0-based positions by 3, EAN-13 weights odd ones.
pub fn check_digit(payload: &[u32], weight_three_even: bool) -> u32 {
    let sum: u32 = payload
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let three = (i % 2 == 0) == weight_three_even;
            if three {
                d * 3
            } else {
                *d
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

fn check(text: &str, digits: &[u32], format: DetectedFormat) -> ValidationResult {
    let weight_three_even = !matches!(format, DetectedFormat::Ean13 | DetectedFormat::Isbn13);
    let payload = &digits[..digits.len() - 1];
    let expected = check_digit(payload, weight_three_even);
    let actual = digits[digits.len() - 1];

    if expected == actual {
        ValidationResult::valid(format, text.to_string())
    } else {
        ValidationResult::invalid(
            format,
            format!(
                "Checksum mismatch: expected check digit {}, found {}",
                expected, actual
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ean13() {
        let result = validate("4006381333931");
        assert!(result.valid);
        assert_eq!(result.format, DetectedFormat::Ean13);
        assert_eq!(result.normalized.as_deref(), Some("4006381333931"));
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_ean13_checksum_mismatch() {
        let result = validate("4006381333932");
        assert!(!result.valid);
        assert_eq!(result.format, DetectedFormat::Ean13);
        let reason = result.reason.unwrap();
        assert!(reason.contains("Checksum mismatch"));
        assert!(reason.contains("expected check digit 1"));
        assert!(reason.contains("found 2"));
    }

    #[test]
    fn test_isbn13_reported_as_own_tag() {
        let result = validate("9781234567897");
        assert!(result.valid);
        assert_eq!(result.format, DetectedFormat::Isbn13);
        // ISBN-13 is not rewritten.
        assert_eq!(result.normalized.as_deref(), Some("9781234567897"));
    }

    #[test]
    fn test_valid_ean8() {
        let result = validate("12345670");
        assert!(result.valid);
        assert_eq!(result.format, DetectedFormat::Ean8);
    }

    #[test]
    fn test_valid_upca() {
        let result = validate("123456789012");
        assert!(result.valid);
        assert_eq!(result.format, DetectedFormat::UpcA);
    }

    #[test]
    fn test_non_digit_input() {
        let result = validate("abc123");
        assert!(!result.valid);
        assert_eq!(result.format, DetectedFormat::Unknown);
        assert!(result.reason.unwrap().contains("only digits"));
    }

    #[test]
    fn test_empty_input() {
        let result = validate("   ");
        assert!(!result.valid);
        assert_eq!(result.format, DetectedFormat::Unknown);
        assert!(result.reason.unwrap().contains("cannot be empty"));
    }

    #[test]
    fn test_unsupported_length_reports_count() {
        let result = validate("12345");
        assert!(!result.valid);
        assert_eq!(result.format, DetectedFormat::Unknown);
        assert!(result.reason.unwrap().contains("5 digits"));
    }

    #[test]
    fn test_surrounding_whitespace_is_stripped() {
        let result = validate("  4006381333931\n");
        assert!(result.valid);
        assert_eq!(result.normalized.as_deref(), Some("4006381333931"));
    }
}
