//! Abstraction over the distributed key-value parameter space.
//!
//! Parameters are named, typed cells (scalar or fixed-length array) owned by
//! one node each. The executing node keeps a table of known parameters; the
//! entries of remote nodes are synchronized through list downloads, single
//! pulls and single pushes. The interpreter only talks to [`ParamSpace`];
//! [`mem::MemParamSpace`] backs the test suite.

use std::time::Duration;

use bitflags::bitflags;
use thiserror::Error;

pub mod mem;

bitflags! {
    /// Access mask bits of a parameter.
    pub struct ParamFlags: u32 {
        /// Writes are refused.
        const READONLY = 0x0001;
    }
}

/// Value type of a parameter cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Unsigned 8-bit integer.
    Uint8,
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Signed 64-bit integer.
    Int64,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Text cell.
    String,
}

impl ParamType {
    /// Coerce a literal string into a value of this type.
    pub fn parse_value(&self, s: &str) -> Result<ParamValue, ParamError> {
        let bad = || ParamError::BadValue(s.to_owned());
        Ok(match self {
            Self::Uint8 => ParamValue::Uint8(s.parse().map_err(|_| bad())?),
            Self::Int8 => ParamValue::Int8(s.parse().map_err(|_| bad())?),
            Self::Uint16 => ParamValue::Uint16(s.parse().map_err(|_| bad())?),
            Self::Int16 => ParamValue::Int16(s.parse().map_err(|_| bad())?),
            Self::Uint32 => ParamValue::Uint32(s.parse().map_err(|_| bad())?),
            Self::Int32 => ParamValue::Int32(s.parse().map_err(|_| bad())?),
            Self::Uint64 => ParamValue::Uint64(s.parse().map_err(|_| bad())?),
            Self::Int64 => ParamValue::Int64(s.parse().map_err(|_| bad())?),
            Self::Float => ParamValue::Float(s.parse().map_err(|_| bad())?),
            Self::Double => ParamValue::Double(s.parse().map_err(|_| bad())?),
            Self::String => ParamValue::String(s.to_owned()),
        })
    }

    /// Zero/empty value of this type, the state of a freshly downloaded
    /// remote entry before its first pull.
    pub fn zero_value(&self) -> ParamValue {
        match self {
            Self::Uint8 => ParamValue::Uint8(0),
            Self::Int8 => ParamValue::Int8(0),
            Self::Uint16 => ParamValue::Uint16(0),
            Self::Int16 => ParamValue::Int16(0),
            Self::Uint32 => ParamValue::Uint32(0),
            Self::Int32 => ParamValue::Int32(0),
            Self::Uint64 => ParamValue::Uint64(0),
            Self::Int64 => ParamValue::Int64(0),
            Self::Float => ParamValue::Float(0.0),
            Self::Double => ParamValue::Double(0.0),
            Self::String => ParamValue::String(std::string::String::new()),
        }
    }
}

/// One typed parameter element.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Unsigned 8-bit integer.
    Uint8(u8),
    /// Signed 8-bit integer.
    Int8(i8),
    /// Unsigned 16-bit integer.
    Uint16(u16),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 32-bit integer.
    Uint32(u32),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 64-bit integer.
    Uint64(u64),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Text cell.
    String(String),
}

impl ParamValue {
    /// The type of this value.
    pub const fn param_type(&self) -> ParamType {
        match self {
            Self::Uint8(_) => ParamType::Uint8,
            Self::Int8(_) => ParamType::Int8,
            Self::Uint16(_) => ParamType::Uint16,
            Self::Int16(_) => ParamType::Int16,
            Self::Uint32(_) => ParamType::Uint32,
            Self::Int32(_) => ParamType::Int32,
            Self::Uint64(_) => ParamType::Uint64,
            Self::Int64(_) => ParamType::Int64,
            Self::Float(_) => ParamType::Float,
            Self::Double(_) => ParamType::Double,
            Self::String(_) => ParamType::String,
        }
    }
}

/// Descriptor of a known parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMeta {
    /// Parameter name, without any element index.
    pub name: String,
    /// Owning node; 0 denotes the local node.
    pub node: u16,
    /// Element type.
    pub ty: ParamType,
    /// Access mask.
    pub flags: ParamFlags,
    /// Element count; 1 for scalars.
    pub array_size: usize,
}

/// Parameter-space failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParamError {
    /// No parameter of that name is known for the addressed node.
    #[error("parameter `{0}` not found")]
    NotFound(String),
    /// The parameter's access mask refuses writes.
    #[error("parameter `{0}` is read-only")]
    ReadOnly(String),
    /// The literal can't be coerced into the parameter's type.
    #[error("invalid parameter value `{0}`")]
    BadValue(String),
    /// The element index lies outside the parameter's array bounds.
    #[error("index out of bounds for parameter `{0}`")]
    IndexOutOfBounds(String),
    /// The remote node did not answer within the allotted time.
    #[error("remote parameter operation to node {0} timed out")]
    RemoteTimeout(u16),
    /// The value's type doesn't match the parameter's element type.
    #[error("value type does not match parameter `{0}`")]
    WrongType(String),
}

/// Interface consumed from the parameter library.
///
/// Implementations are shared between workers and must be thread-safe;
/// element reads and writes are serialized by the implementation.
pub trait ParamSpace: Send + Sync {
    /// Snapshot of every known parameter descriptor.
    fn params(&self) -> Vec<ParamMeta>;

    /// Descriptor of one parameter, if known.
    fn find(&self, name: &str, node: u16) -> Option<ParamMeta> {
        self.params().into_iter().find(|p| p.name == name && p.node == node)
    }

    /// Read element `index` of a parameter from the local table.
    fn get(&self, name: &str, node: u16, index: usize) -> Result<ParamValue, ParamError>;

    /// Write element `index` of a parameter in the local table.
    fn set(&self, name: &str, node: u16, index: usize, value: ParamValue) -> Result<(), ParamError>;

    /// Fetch the parameter list of a remote node into the local table.
    fn download_list(&self, node: u16, timeout: Duration) -> Result<(), ParamError>;

    /// Refresh one remote parameter (all elements with `index == None`).
    fn pull(&self, name: &str, node: u16, index: Option<usize>, timeout: Duration) -> Result<(), ParamError>;

    /// Write one remote parameter element, optionally awaiting an
    /// acknowledgement.
    fn push(
        &self,
        name: &str,
        node: u16,
        index: Option<usize>,
        value: ParamValue,
        timeout: Duration,
        ack: bool,
    ) -> Result<(), ParamError>;
}
