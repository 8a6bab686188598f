//! Station code types.

use std::fmt;

use serde::{Serialize, Serializer};

/// Error returned when parsing an invalid CRS code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid CRS code: {reason}")]
pub struct InvalidCrs {
    reason: &'static str,
}

impl InvalidCrs {
    /// Human-readable reason the code was rejected.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// A valid 3-letter CRS (Computer Reservation System) station code.
///
/// CRS codes are always 3 uppercase ASCII letters. This type guarantees
/// that any `Crs` value is well-formed by construction; whether the code
/// names a real station is checked separately by
/// [`StationCodeValidator`](crate::stations::StationCodeValidator).
///
/// # Examples
///
/// ```
/// use station_board::domain::Crs;
///
/// let eus = Crs::parse("EUS").unwrap();
/// assert_eq!(eus.as_str(), "EUS");
///
/// // Lowercase is rejected by the strict parser...
/// assert!(Crs::parse("eus").is_err());
/// // ...but accepted after normalization
/// assert_eq!(Crs::parse_normalized(" eus ").unwrap(), eus);
///
/// // Wrong length is rejected
/// assert!(Crs::parse("EU").is_err());
/// assert!(Crs::parse("EUSX").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Crs([u8; 3]);

impl Crs {
    /// Parse a CRS code from a string.
    ///
    /// The input must be exactly 3 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidCrs> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidCrs {
                reason: "must be exactly 3 characters",
            });
        }

        for &b in bytes {
            if !b.is_ascii_uppercase() {
                return Err(InvalidCrs {
                    reason: "must be uppercase ASCII letters A-Z",
                });
            }
        }

        Ok(Crs([bytes[0], bytes[1], bytes[2]]))
    }

    /// Parse user input: surrounding whitespace is trimmed and letters are
    /// uppercased before strict parsing.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidCrs> {
        Self::parse(&s.trim().to_ascii_uppercase())
    }

    /// Returns the CRS code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII uppercase letters are ever stored
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crs({})", self.as_str())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_crs() {
        assert!(Crs::parse("KGX").is_ok());
        assert!(Crs::parse("PAD").is_ok());
        assert!(Crs::parse("EUS").is_ok());
        assert!(Crs::parse("AAA").is_ok());
        assert!(Crs::parse("ZZZ").is_ok());
    }

    #[test]
    fn reject_lowercase() {
        assert!(Crs::parse("kgx").is_err());
        assert!(Crs::parse("Kgx").is_err());
        assert!(Crs::parse("KGx").is_err());
    }

    #[test]
    fn reject_wrong_length() {
        assert!(Crs::parse("").is_err());
        assert!(Crs::parse("K").is_err());
        assert!(Crs::parse("KG").is_err());
        assert!(Crs::parse("KGXX").is_err());
        assert!(Crs::parse("KINGS").is_err());
    }

    #[test]
    fn reject_non_ascii() {
        assert!(Crs::parse("K1X").is_err());
        assert!(Crs::parse("K-X").is_err());
        assert!(Crs::parse("K X").is_err());
        assert!(Crs::parse("KÖX").is_err());
    }

    #[test]
    fn normalized_accepts_mixed_case_and_whitespace() {
        let kgx = Crs::parse("KGX").unwrap();
        assert_eq!(Crs::parse_normalized("kgx").unwrap(), kgx);
        assert_eq!(Crs::parse_normalized("  Kgx\t").unwrap(), kgx);
        assert!(Crs::parse_normalized("k g x").is_err());
    }

    #[test]
    fn display_and_debug() {
        let crs = Crs::parse("PAD").unwrap();
        assert_eq!(format!("{}", crs), "PAD");
        assert_eq!(format!("{:?}", crs), "Crs(PAD)");
    }

    #[test]
    fn serializes_as_plain_string() {
        let crs = Crs::parse("EUS").unwrap();
        assert_eq!(serde_json::to_string(&crs).unwrap(), r#""EUS""#);
    }

    #[test]
    fn hash_consistent_with_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Crs::parse("KGX").unwrap());
        assert!(set.contains(&Crs::parse("KGX").unwrap()));
        assert!(!set.contains(&Crs::parse("PAD").unwrap()));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Roundtrip: parse then as_str returns the original
        #[test]
        fn roundtrip(s in "[A-Z]{3}") {
            let crs = Crs::parse(&s).unwrap();
            prop_assert_eq!(crs.as_str(), s.as_str());
        }

        /// Case never matters to the normalizing parser
        #[test]
        fn normalized_is_case_insensitive(s in "[a-zA-Z]{3}") {
            let crs = Crs::parse_normalized(&s).unwrap();
            prop_assert_eq!(crs.as_str(), s.to_ascii_uppercase());
        }

        /// Wrong-length strings are always rejected
        #[test]
        fn wrong_length_rejected(s in "[A-Z]{0,2}|[A-Z]{4,10}") {
            prop_assert!(Crs::parse(&s).is_err());
            prop_assert!(Crs::parse_normalized(&s).is_err());
        }

        /// Strings with digits are rejected
        #[test]
        fn digits_rejected(s in "[A-Z0-9]{3}".prop_filter("has digit", |s| s.chars().any(|c| c.is_ascii_digit()))) {
            prop_assert!(Crs::parse(&s).is_err());
        }
    }
}
