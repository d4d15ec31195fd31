//! String (de)serialization for platform snowflake IDs.
//!
//! Snowflakes exceed the 53-bit range JSON consumers hold losslessly, so
//! member, channel and role IDs all cross the wire as decimal strings.

use std::{fmt, marker::PhantomData, str::FromStr};

use serde::{de, Deserializer, Serializer};

pub(crate) fn serialize<T, S>(id: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_str(id)
}

pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    T::Err: fmt::Display,
    D: Deserializer<'de>,
{
    struct IdVisitor<T>(PhantomData<T>);

    impl<'de, T> de::Visitor<'de> for IdVisitor<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        type Value = T;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a platform ID encoded as a decimal string")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            value.parse().map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_str(IdVisitor(PhantomData))
}
