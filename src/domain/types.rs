//! Core type definitions for infraction records
//!
//! Identifiers, enumerated classifications and the small normalization helpers
//! shared by the form, the HTTP boundary and the stores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Maximum number of digits accepted in a phone number (DDD + 9 digits)
pub const PHONE_MAX_DIGITS: usize = 11;

/// Number of digits in a CEP (Brazilian postal code)
pub const CEP_DIGITS: usize = 8;

/// Store-assigned identifier of an infraction record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfractionId(pub i64);

impl InfractionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InfractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InfractionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Classification of the area where the infraction happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classificacao {
    Particular,
    Verde,
    #[serde(rename = "Pública")]
    Publica,
}

impl Classificacao {
    pub const ALL: [Classificacao; 3] = [
        Classificacao::Particular,
        Classificacao::Verde,
        Classificacao::Publica,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classificacao::Particular => "Particular",
            Classificacao::Verde => "Verde",
            Classificacao::Publica => "Pública",
        }
    }
}

impl fmt::Display for Classificacao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classificacao {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Particular" => Ok(Classificacao::Particular),
            "Verde" => Ok(Classificacao::Verde),
            "Pública" => Ok(Classificacao::Publica),
            other => Err(ValidationError::new(
                "classificacao",
                format!("classificação inválida: '{other}' (esperado Particular, Verde ou Pública)"),
            )),
        }
    }
}

/// Notice series printed on the paper form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Serie {
    A,
    B,
    C,
}

impl Serie {
    pub fn as_str(&self) -> &'static str {
        match self {
            Serie::A => "A",
            Serie::B => "B",
            Serie::C => "C",
        }
    }
}

impl fmt::Display for Serie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Serie {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Serie::A),
            "B" => Ok(Serie::B),
            "C" => Ok(Serie::C),
            other => Err(ValidationError::new(
                "serie",
                format!("série inválida: '{other}' (esperado A, B ou C)"),
            )),
        }
    }
}

/// Keep only ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format a phone number as `(DD) DDDDD-DDDD`.
///
/// Non-digits are dropped and anything past eleven digits is discarded before
/// the mask is applied. Partial input is masked progressively, so the result
/// is stable while the user is still typing.
pub fn mask_phone(input: &str) -> String {
    let digits: String = digits_only(input).chars().take(PHONE_MAX_DIGITS).collect();
    let len = digits.len();

    if len == 0 {
        return String::new();
    }

    let mut formatted = format!("({}", &digits[..len.min(2)]);
    if len >= 3 {
        formatted.push_str(&format!(") {}", &digits[2..len.min(7)]));
    }
    if len >= 8 {
        formatted.push_str(&format!("-{}", &digits[7..]));
    }
    formatted
}
