//! Codec for Clarity values returned by read-only contract calls.
//!
//! The node returns view results as `0x`-prefixed hex of the consensus
//! serialization. Each value starts with a one-byte type tag; lengths are
//! 4-byte big-endian unless noted.

use alloy::hex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TAG_INT: u8 = 0x00;
const TAG_UINT: u8 = 0x01;
const TAG_BUFFER: u8 = 0x02;
const TAG_TRUE: u8 = 0x03;
const TAG_FALSE: u8 = 0x04;
const TAG_STANDARD_PRINCIPAL: u8 = 0x05;
const TAG_CONTRACT_PRINCIPAL: u8 = 0x06;
const TAG_OK: u8 = 0x07;
const TAG_ERR: u8 = 0x08;
const TAG_NONE: u8 = 0x09;
const TAG_SOME: u8 = 0x0a;
const TAG_LIST: u8 = 0x0b;
const TAG_TUPLE: u8 = 0x0c;
const TAG_STRING_ASCII: u8 = 0x0d;
const TAG_STRING_UTF8: u8 = 0x0e;

/// Nesting limit for optionals, responses, lists and tuples.
const MAX_DEPTH: usize = 32;

/// A decoded Clarity value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Bool(bool),
    Buffer(Vec<u8>),
    /// Version byte and hash160 of a standard principal.
    StandardPrincipal { version: u8, hash160: [u8; 20] },
    ContractPrincipal { version: u8, hash160: [u8; 20], name: String },
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(Vec<(String, ClarityValue)>),
    StringAscii(String),
    StringUtf8(String),
}

/// Errors produced while decoding or encoding Clarity values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClarityError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("unexpected end of input at byte {0}")]
    Truncated(usize),

    #[error("unknown type tag 0x{tag:02x} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("invalid string at byte {0}")]
    InvalidString(usize),

    #[error("nesting deeper than {MAX_DEPTH}")]
    TooDeep,

    #[error("cannot encode {0} values")]
    Unsupported(&'static str),

    #[error("expected {expected}, found {found}")]
    UnexpectedType { expected: &'static str, found: &'static str },
}

impl ClarityValue {
    /// Decode from a hex string, with or without `0x`.
    pub fn from_hex(input: &str) -> Result<Self, ClarityError> {
        let bytes = hex::decode(input.trim().trim_start_matches("0x"))
            .map_err(|e| ClarityError::Hex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Decode from raw bytes. The whole buffer must be consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClarityError> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let value = cursor.value(0)?;
        let rest = bytes.len() - cursor.pos;
        if rest > 0 {
            return Err(ClarityError::TrailingBytes(rest));
        }
        Ok(value)
    }

    /// `0x`-prefixed hex encoding, as accepted in call-read arguments.
    pub fn to_hex(&self) -> Result<String, ClarityError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(format!("0x{}", hex::encode(out)))
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), ClarityError> {
        match self {
            ClarityValue::Int(v) => {
                out.push(TAG_INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::UInt(v) => {
                out.push(TAG_UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::Bool(true) => out.push(TAG_TRUE),
            ClarityValue::Bool(false) => out.push(TAG_FALSE),
            ClarityValue::Buffer(data) => {
                out.push(TAG_BUFFER);
                push_len(out, data.len())?;
                out.extend_from_slice(data);
            }
            ClarityValue::StringAscii(s) => {
                out.push(TAG_STRING_ASCII);
                push_len(out, s.len())?;
                out.extend_from_slice(s.as_bytes());
            }
            ClarityValue::StringUtf8(s) => {
                out.push(TAG_STRING_UTF8);
                push_len(out, s.len())?;
                out.extend_from_slice(s.as_bytes());
            }
            ClarityValue::OptionalNone => out.push(TAG_NONE),
            ClarityValue::OptionalSome(inner) => {
                out.push(TAG_SOME);
                inner.encode_into(out)?;
            }
            ClarityValue::ResponseOk(inner) => {
                out.push(TAG_OK);
                inner.encode_into(out)?;
            }
            ClarityValue::ResponseErr(inner) => {
                out.push(TAG_ERR);
                inner.encode_into(out)?;
            }
            ClarityValue::StandardPrincipal { .. } | ClarityValue::ContractPrincipal { .. } => {
                return Err(ClarityError::Unsupported("principal"))
            }
            ClarityValue::List(_) => return Err(ClarityError::Unsupported("list")),
            ClarityValue::Tuple(_) => return Err(ClarityError::Unsupported("tuple")),
        }
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ClarityValue::Int(_) => "int",
            ClarityValue::UInt(_) => "uint",
            ClarityValue::Bool(_) => "bool",
            ClarityValue::Buffer(_) => "buffer",
            ClarityValue::StandardPrincipal { .. } => "principal",
            ClarityValue::ContractPrincipal { .. } => "contract-principal",
            ClarityValue::ResponseOk(_) => "ok",
            ClarityValue::ResponseErr(_) => "err",
            ClarityValue::OptionalNone => "none",
            ClarityValue::OptionalSome(_) => "some",
            ClarityValue::List(_) => "list",
            ClarityValue::Tuple(_) => "tuple",
            ClarityValue::StringAscii(_) => "string-ascii",
            ClarityValue::StringUtf8(_) => "string-utf8",
        }
    }

    /// Read a uint, looking through a single `ok` wrapper.
    pub fn expect_uint(&self) -> Result<u128, ClarityError> {
        match self {
            ClarityValue::UInt(v) => Ok(*v),
            ClarityValue::ResponseOk(inner) => match inner.as_ref() {
                ClarityValue::UInt(v) => Ok(*v),
                other => Err(ClarityError::UnexpectedType {
                    expected: "uint",
                    found: other.type_name(),
                }),
            },
            other => Err(ClarityError::UnexpectedType {
                expected: "uint",
                found: other.type_name(),
            }),
        }
    }
}

fn push_len(out: &mut Vec<u8>, len: usize) -> Result<(), ClarityError> {
    let len = u32::try_from(len).map_err(|_| ClarityError::Unsupported("oversized"))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ClarityError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClarityError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClarityError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ClarityError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn array16(&mut self) -> Result<[u8; 16], ClarityError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn hash160(&mut self) -> Result<[u8; 20], ClarityError> {
        let mut buf = [0u8; 20];
        buf.copy_from_slice(self.take(20)?);
        Ok(buf)
    }

    fn string(&mut self, len: usize) -> Result<String, ClarityError> {
        let start = self.pos;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ClarityError::InvalidString(start))
    }

    fn value(&mut self, depth: usize) -> Result<ClarityValue, ClarityError> {
        if depth > MAX_DEPTH {
            return Err(ClarityError::TooDeep);
        }
        let offset = self.pos;
        let tag = self.u8()?;
        let value = match tag {
            TAG_INT => ClarityValue::Int(i128::from_be_bytes(self.array16()?)),
            TAG_UINT => ClarityValue::UInt(u128::from_be_bytes(self.array16()?)),
            TAG_BUFFER => {
                let len = self.u32()? as usize;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            TAG_TRUE => ClarityValue::Bool(true),
            TAG_FALSE => ClarityValue::Bool(false),
            TAG_STANDARD_PRINCIPAL => ClarityValue::StandardPrincipal {
                version: self.u8()?,
                hash160: self.hash160()?,
            },
            TAG_CONTRACT_PRINCIPAL => {
                let version = self.u8()?;
                let hash160 = self.hash160()?;
                let name_len = self.u8()? as usize;
                let name = self.string(name_len)?;
                ClarityValue::ContractPrincipal {
                    version,
                    hash160,
                    name,
                }
            }
            TAG_OK => ClarityValue::ResponseOk(Box::new(self.value(depth + 1)?)),
            TAG_ERR => ClarityValue::ResponseErr(Box::new(self.value(depth + 1)?)),
            TAG_NONE => ClarityValue::OptionalNone,
            TAG_SOME => ClarityValue::OptionalSome(Box::new(self.value(depth + 1)?)),
            TAG_LIST => {
                let len = self.u32()? as usize;
                // Each element needs at least one byte.
                if len > self.bytes.len() - self.pos {
                    return Err(ClarityError::Truncated(self.pos));
                }
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            TAG_TUPLE => {
                let len = self.u32()? as usize;
                if len > self.bytes.len() - self.pos {
                    return Err(ClarityError::Truncated(self.pos));
                }
                let mut fields = Vec::with_capacity(len);
                for _ in 0..len {
                    let name_len = self.u8()? as usize;
                    let name = self.string(name_len)?;
                    fields.push((name, self.value(depth + 1)?));
                }
                ClarityValue::Tuple(fields)
            }
            TAG_STRING_ASCII => {
                let len = self.u32()? as usize;
                let start = self.pos;
                let s = self.string(len)?;
                if !s.is_ascii() {
                    return Err(ClarityError::InvalidString(start));
                }
                ClarityValue::StringAscii(s)
            }
            TAG_STRING_UTF8 => {
                let len = self.u32()? as usize;
                ClarityValue::StringUtf8(self.string(len)?)
            }
            tag => return Err(ClarityError::UnknownTag { tag, offset }),
        };
        Ok(value)
    }
}
