use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use rocket::{
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of bytes in an account address.
pub const ADDRESS_LENGTH: usize = 20;

const PREFIX: &str = "0x";

/// An account address, identifying admins, candidates, voters and funders.
///
/// Parsed from and displayed as `0x` followed by 40 hex digits. Parsing is
/// case-insensitive (so checksummed addresses are accepted); display is
/// always lower-case.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("address must start with `0x`")]
    MissingPrefix,
    #[error("address must contain exactly 40 hex digits, found {0}")]
    InvalidLength(usize),
    #[error("address contains a non-hex character")]
    InvalidDigit,
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(PREFIX)
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(ParseError::MissingPrefix)?;
        if digits.len() != ADDRESS_LENGTH * 2 {
            return Err(ParseError::InvalidLength(digits.len()));
        }
        let mut bytes = [0; ADDRESS_LENGTH];
        HEXLOWER_PERMISSIVE
            .decode_mut(digits.as_bytes(), &mut bytes)
            .map_err(|_| ParseError::InvalidDigit)?;
        Ok(Self(bytes))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}", HEXLOWER.encode(&self.0))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl<'a> FromParam<'a> for Address {
    type Error = ParseError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

impl UriDisplay<Path> for Address {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(self.to_string())
    }
}

impl_from_uri_param_identity!([Path] Address);
