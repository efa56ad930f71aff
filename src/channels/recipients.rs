//! Per-channel recipient directory.
//!
//! Config files describe recipients as a map from user id to addresses,
//! with `"*"` reserved for addresses that receive every notification:
//!
//! ```json
//! { "*": ["global-key"], "1": ["alice-phone"], "2": ["bob-phone", "bob-pad"] }
//! ```
//!
//! On load the `"*"` entry is lifted into [`RecipientDirectory::global`] so
//! the wildcard never has to be special-cased after deserialization.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::memo::last_segment;

/// Reserved config key for global recipients.
pub const WILDCARD_KEY: &str = "*";

/// Addresses (device keys, chat ids) grouped by owning user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientDirectory {
    /// Addresses that receive every notification.
    pub global: Vec<String>,
    /// Per-user addresses, in config order.
    pub per_user: Vec<(String, Vec<String>)>,
}

impl RecipientDirectory {
    pub fn new(global: Vec<String>, per_user: Vec<(String, Vec<String>)>) -> Self {
        Self { global, per_user }
    }

    /// Number of configured addresses, globals included.
    pub fn len(&self) -> usize {
        self.global.len() + self.per_user.iter().map(|(_, a)| a.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Everyone who should hear about an action by `creator`.
    ///
    /// Global addresses come first, then every other user's addresses. The
    /// creator's own addresses are skipped; an entry belongs to the creator
    /// when its key is either the full resource name (`users/1`) or the
    /// trailing id (`1`). Duplicates are kept.
    pub fn resolve(&self, creator: &str) -> Vec<String> {
        let creator_id = last_segment(creator);
        let mut recipients = self.global.clone();
        for (user, addresses) in &self.per_user {
            if user == creator || user == creator_id {
                continue;
            }
            recipients.extend(addresses.iter().cloned());
        }
        recipients
    }
}

impl<'de> Deserialize<'de> for RecipientDirectory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DirectoryVisitor;

        impl<'de> Visitor<'de> for DirectoryVisitor {
            type Value = RecipientDirectory;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of user id to a list of addresses")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(RecipientDirectory::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut directory = RecipientDirectory::default();
                while let Some((key, addresses)) = map.next_entry::<String, Vec<String>>()? {
                    if key == WILDCARD_KEY {
                        directory.global.extend(addresses);
                    } else {
                        directory.per_user.push((key, addresses));
                    }
                }
                Ok(directory)
            }
        }

        deserializer.deserialize_any(DirectoryVisitor)
    }
}
