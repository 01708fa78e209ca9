use serde::Serializer;

/// Lets the hex serializers stay generic over the register widths used in target descriptions.
pub trait SerializeUnsignedInt {
    fn serialize_int<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer;
}

macro_rules! impl_serialize_unsigned_int {
    ($($int:ty => $method:ident),* $(,)?) => {
        $(
            impl SerializeUnsignedInt for $int {
                fn serialize_int<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: Serializer,
                {
                    serializer.$method(*self)
                }
            }
        )*
    };
}

impl_serialize_unsigned_int!(u8 => serialize_u8, u16 => serialize_u16, u32 => serialize_u32);
