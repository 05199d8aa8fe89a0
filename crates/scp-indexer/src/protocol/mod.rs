//! SCP message parsing and validation.
//!
//! A message is classified once into a [`Message`] and every later step matches on it.
//!
//! # Message layouts
//!
//! Creation, space delimited, version token included in the parameter count:
//!
//! | Version | Layout                                                 |
//! |---------|--------------------------------------------------------|
//! | SCP-1   | `SCPCREATE1 <name> <ticker> <max-supply>`              |
//! | SCP-2   | `SCPCREATE2 <name> <ticker> <max-supply> <inflation> <min-age>` |
//! | SCP-4   | `SCPCREATE4 <name> <max-mints or -1> <protected 0/1>`  |
//!
//! Calls name their contract by creation txid, or by `id<index>` once token indexing is
//! active: `<contract> <method> <args...>`.

mod engine;
mod number;

pub use engine::{Outcome, ProtocolEngine};
pub use number::{parse_number, safe_integer, utf16_len};

use crate::constants::TXID_HEX_LEN;
use crate::error::ValidationError;
use crate::ledger::{ContractRef, TokenKind};
use bitcoin::Txid;
use number::safe_integer_above;
use std::str::FromStr;

const CREATE_PREFIX: &str = "SCPCREATE";
const INDEX_PREFIX: &str = "id";

/// Expected number of space separated tokens of a creation message, per SCP version.
///
/// SCP-3 was never defined and always fails the count check.
const CREATION_PARAM_COUNTS: [(u8, Option<usize>); 4] =
    [(1, Some(4)), (2, Some(6)), (3, None), (4, Some(4))];

/// A classified SCP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<'a> {
    Create(Creation<'a>),
    Call(Call<'a>),
    /// Any other payload, e.g. an unrelated `OP_RETURN`.
    Other,
}

impl<'a> Message<'a> {
    /// Classifies `message`.
    ///
    /// `indexed_addressing` enables `id<index>` contract references.
    pub fn decode(message: &'a str, indexed_addressing: bool) -> Result<Self, ValidationError> {
        let indexed = indexed_addressing && message.starts_with(INDEX_PREFIX);

        if !indexed && message.starts_with(CREATE_PREFIX) {
            return Creation::decode(message).map(Self::Create);
        }

        // Short unindexed payloads can not name a contract by txid.
        if indexed || utf16_len(message) > TXID_HEX_LEN {
            return Ok(Call::decode(message, indexed).map_or(Self::Other, Self::Call));
        }

        Ok(Self::Other)
    }
}

/// A validated contract creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation<'a> {
    /// SCP-1 or SCP-2 fungible token.
    Token {
        kind: TokenKind,
        name: &'a str,
        ticker: &'a str,
        max_supply: u64,
    },
    /// SCP-4 NFT collection.
    Collection {
        name: &'a str,
        max_mints: Option<u64>,
        protected: bool,
    },
}

impl<'a> Creation<'a> {
    pub fn version(&self) -> u8 {
        match self {
            Self::Token { kind, .. } => kind.version(),
            Self::Collection { .. } => 4,
        }
    }

    fn decode(message: &'a str) -> Result<Self, ValidationError> {
        let params = message.split(' ').collect::<Vec<_>>();

        let version = (params[0] != CREATE_PREFIX)
            .then(|| parse_number(&params[0][CREATE_PREFIX.len()..]))
            .flatten();
        let (version, expected) = CREATION_PARAM_COUNTS
            .iter()
            .find(|(v, _)| Some(f64::from(*v)) == version)
            .map_or((None, None), |(v, count)| (Some(*v), *count));

        if expected != Some(params.len()) {
            return Err(ValidationError::ParamCount {
                version,
                found: params.len(),
                expected,
            });
        }

        let creation = match version {
            Some(1) => Self::decode_token(&params, TokenKind::Scp1),
            Some(2) => safe_integer_above(params[4], 1)
                .zip(safe_integer_above(params[5], 1))
                .and_then(|(inflation, min_age)| {
                    Self::decode_token(&params, TokenKind::Scp2 { inflation, min_age })
                }),
            _ => Self::decode_collection(&params),
        };

        creation.ok_or(ValidationError::InvalidParams {
            version: version.unwrap_or_default(),
        })
    }

    fn decode_token(params: &[&'a str], kind: TokenKind) -> Option<Self> {
        let (name, ticker) = (params[1], params[2]);
        if name.is_empty() || ticker.is_empty() {
            return None;
        }
        let max_supply = safe_integer_above(params[3], 0)?;
        Some(Self::Token {
            kind,
            name,
            ticker,
            max_supply,
        })
    }

    fn decode_collection(params: &[&'a str]) -> Option<Self> {
        let name = params[1];
        if name.is_empty() {
            return None;
        }

        let max_mints = match safe_integer(params[2]) {
            Some(-1) => None,
            Some(max) if max > 0 => Some(max as u64),
            _ => return None,
        };

        let protected = match params[3] {
            "0" => false,
            "1" => true,
            _ => return None,
        };

        Some(Self::Collection {
            name,
            max_mints,
            protected,
        })
    }
}

/// A call of a contract method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call<'a> {
    pub target: ContractRef,
    pub method: &'a str,
    pub args: Vec<&'a str>,
}

impl<'a> Call<'a> {
    /// Returns `None` if the message does not name a contract and a method.
    fn decode(message: &'a str, indexed: bool) -> Option<Self> {
        let mut params = message.split(' ');
        let head = params.next()?;

        let target = if indexed {
            let index = safe_integer(&head[INDEX_PREFIX.len()..])?;
            ContractRef::Index(u64::try_from(index).ok()?)
        } else {
            // Contract ids are rendered as lowercase hex.
            let is_txid = head.len() == TXID_HEX_LEN
                && head.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
            if !is_txid {
                return None;
            }
            ContractRef::Txid(Txid::from_str(head).ok()?)
        };

        let method = params.next().filter(|method| !method.is_empty())?;

        Some(Self {
            target,
            method,
            args: params.collect(),
        })
    }

    /// Argument at `index`, counted after the method.
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }
}
