use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// Implement the shared plumbing for an integer amount newtype.
///
/// Amounts travel as decimal strings since they routinely exceed what JSON
/// numbers and BSON integers can hold.
macro_rules! decimal_amount {
    ($name:ident) => {
        impl $name {
            pub const ZERO: Self = Self(0);

            pub fn new(value: u128) -> Self {
                Self(value)
            }

            pub fn get(self) -> u128 {
                self.0
            }

            pub fn is_zero(self) -> bool {
                self.0 == 0
            }

            pub fn checked_add(self, other: Self) -> Option<Self> {
                self.0.checked_add(other.0).map(Self)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let string = String::deserialize(deserializer)?;
                string.parse().map_err(D::Error::custom)
            }
        }
    };
}

/// An amount of ether, in wei (10^-18 ETH).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(u128);

/// An amount of US dollars with 18 decimal places, matching wei.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usd(u128);

decimal_amount!(Wei);
decimal_amount!(Usd);

impl Wei {
    pub const PER_ETHER: u128 = 1_000_000_000_000_000_000;
}
