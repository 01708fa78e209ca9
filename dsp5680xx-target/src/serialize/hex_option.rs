use super::serialize_u_int::SerializeUnsignedInt;
use serde::{self, ser::Serializer};

pub(crate) fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: std::fmt::LowerHex + SerializeUnsignedInt,
{
    match value {
        Some(value) if serializer.is_human_readable() => {
            serializer.serialize_some(&format!("{value:#x}"))
        }
        Some(value) => serializer.serialize_some(&HexInt(value)),
        None => serializer.serialize_none(),
    }
}

struct HexInt<'a, T>(&'a T);

impl<T: SerializeUnsignedInt> serde::Serialize for HexInt<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize_int(serializer)
    }
}
