// SPDX-License-Identifier: MIT

//! ID generation abstractions.
//!
//! Every identifier in this crate is `{prefix}-{epoch_ms}-{8 hex chars}`:
//! a timestamp component for rough chronological ordering on disk listings,
//! plus a random suffix so two ids minted in the same millisecond never
//! collide. `SmolStr` backs the buffer so short-lived ids stay inline
//! without heap-allocating.

use crate::clock::Clock;
use smol_str::SmolStr;

const RANDOM_ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

/// Render a `{prefix}-{epoch_ms}-{suffix}` id using the given clock.
pub fn timestamped(prefix: &str, clock: &impl Clock) -> SmolStr {
    let epoch_ms = clock.epoch_ms();
    let suffix = nanoid::nanoid!(8, &RANDOM_ALPHABET);
    SmolStr::new(format!("{prefix}-{epoch_ms}-{suffix}"))
}

/// Define a newtype ID wrapper around [`SmolStr`] with a type prefix.
///
/// Generates `new(clock)` for a timestamp-plus-random id, `from_string()`
/// for parsing an id read back off disk, `as_str()`, `Display`, `From<String>`,
/// `From<&str>`, `PartialEq<str>`, `Borrow<str>`, and `Deref`.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct RunId("run");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new timestamp-plus-random id.
            pub fn new(clock: &impl $crate::clock::Clock) -> Self {
                Self($crate::id::timestamped(Self::PREFIX, clock))
            }

            /// Create an id from an existing string (parsing a path component).
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self(smol_str::SmolStr::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
