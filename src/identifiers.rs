//! Owned string identifiers for the Matrix entities the timeline engine refers to.
//!
//! These mirror the shape of ruma's `OwnedEventId`/`OwnedUserId`/`OwnedRoomId`,
//! but do not validate the sigil or server name: local echoes carry
//! transaction-derived IDs, and the engine must never reject an event
//! just because its ID is unusual.

use std::{borrow::Borrow, fmt, ops::Deref};

use serde::{Deserialize, Serialize};

macro_rules! owned_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

owned_identifier!(
    /// The ID of a single event, unique within one timeline.
    OwnedEventId
);
owned_identifier!(
    /// A fully-qualified Matrix user ID, e.g. `@alice:example.org`.
    OwnedUserId
);
owned_identifier!(
    /// A Matrix room ID, e.g. `!abc:example.org`.
    OwnedRoomId
);
