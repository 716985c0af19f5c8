//! Serialization traits for the objects exchanged between the client and
//! the server.

use crate::ckks::CkksParameters;
use std::sync::Arc;

/// Serialization into a vector of bytes.
pub trait Serialize {
    /// Serialize `Self` into a vector of bytes.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Deserialization of a parametrized value.
pub trait DeserializeParametrized
where
    Self: Sized,
{
    /// The type of error returned.
    type Error;

    /// Attempt to deserialize from a vector of bytes.
    fn from_bytes(bytes: &[u8], par: &Arc<CkksParameters>) -> Result<Self, Self::Error>;
}

/// Deserialization without context.
pub trait Deserialize
where
    Self: Sized,
{
    /// The type of error returned.
    type Error;

    /// Attempt to deserialize from a vector of bytes.
    fn try_deserialize(bytes: &[u8]) -> Result<Self, Self::Error>;
}
