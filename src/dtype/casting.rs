//! Casting policies for implicit dtype conversions

use super::{promote_types, DType};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Rule set governing whether an implicit dtype conversion is permitted
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Casting {
    /// Only identical dtypes
    No,
    /// Identical dtypes (byte order is not modelled, so same as `No`)
    Equiv,
    /// Only conversions that preserve every value
    Safe,
    /// Safe conversions or conversions within the same kind or to a higher kind
    #[default]
    SameKind,
    /// Any conversion
    Unsafe,
}

impl Casting {
    /// Policy name as written in configuration
    pub const fn name(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Equiv => "equiv",
            Self::Safe => "safe",
            Self::SameKind => "same_kind",
            Self::Unsafe => "unsafe",
        }
    }
}

impl fmt::Display for Casting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Casting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "no" => Ok(Self::No),
            "equiv" => Ok(Self::Equiv),
            "safe" => Ok(Self::Safe),
            "same_kind" | "same-kind" => Ok(Self::SameKind),
            "unsafe" => Ok(Self::Unsafe),
            other => Err(Error::invalid_argument(
                "casting",
                format!("expected one of no, equiv, safe, same_kind, unsafe; got '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for Casting {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Whether `from` converts to `to` without losing any value
fn is_safe(from: DType, to: DType) -> bool {
    if from == to || from == DType::Bool {
        return true;
    }
    // Integers only go safely into a strictly wider float; int64 -> float64 is the
    // conventional exception.
    if from.is_int() && to.is_inexact() {
        let component = to.real_dtype();
        return component.bits() > from.bits() || component == DType::F64;
    }
    promote_types(from, to) == to
}

/// Check whether a conversion from `from` to `to` is permitted under `casting`
pub fn can_cast(from: DType, to: DType, casting: Casting) -> bool {
    match casting {
        Casting::No | Casting::Equiv => from == to,
        Casting::Safe => is_safe(from, to),
        Casting::SameKind => {
            is_safe(from, to) || from.category().kind_rank() <= to.category().kind_rank()
        }
        Casting::Unsafe => true,
    }
}
