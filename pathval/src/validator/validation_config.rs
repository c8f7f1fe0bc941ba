//! Structures and functions related to configuring certification path validation operations

use alloc::collections::BTreeSet;

use const_oid::db::rfc5280::ANY_POLICY;
use der::asn1::ObjectIdentifier;

use pkiprocmacros::*;

use crate::{util::time_of_interest::TimeOfInterest, PathCertificate};

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "std")]
use std::path::Path;

#[cfg(feature = "std")]
use alloc::string::String;

#[cfg(feature = "std")]
use log::error;

#[cfg(feature = "std")]
use crate::{Error, Result};

/// `ObjectIdentifierSet` is a typedef for a set of ObjectIdentifier values.
pub type ObjectIdentifierSet = BTreeSet<ObjectIdentifier>;

/// [`ValidationConfig`] holds the inputs to certification path validation described in
/// [RFC 5280 Section 6.1.1], other than the certification path itself.
///
/// Instances are not modified once created. Each `with_` function returns a new instance that
/// differs from the original only in the named field.
///
/// With the `std` feature, instances can be serialized to and from JSON. Object identifiers are
/// represented as dotted strings and the reference time as seconds since the Unix epoch. The trust
/// anchor is not serialized.
///
/// [RFC 5280 Section 6.1.1]: <https://datatracker.ietf.org/doc/html/rfc5280#section-6.1.1>
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct ValidationConfig {
    reference_time: TimeOfInterest,
    max_path_length: u32,
    #[cfg_attr(feature = "std", serde(skip))]
    trust_anchor: Option<PathCertificate>,
    #[cfg_attr(feature = "std", serde(default))]
    policy_mapping_inhibited: bool,
    #[cfg_attr(feature = "std", serde(default))]
    explicit_policy_required: bool,
    #[cfg_attr(feature = "std", serde(default))]
    any_policy_inhibited: bool,
    #[cfg_attr(feature = "std", serde(default))]
    check_revocation_status: bool,
    #[cfg_attr(
        feature = "std",
        serde(with = "oid_set_serde", default = "default_initial_policy_set")
    )]
    initial_policy_set: ObjectIdentifierSet,
}

fn default_initial_policy_set() -> ObjectIdentifierSet {
    ObjectIdentifierSet::from([ANY_POLICY])
}

impl ValidationConfig {
    /// `new` returns a configuration with the given reference time and maximum path length, an
    /// initial policy set containing only anyPolicy, no trust anchor override and all flags false.
    pub fn new(reference_time: TimeOfInterest, max_path_length: u32) -> Self {
        ValidationConfig {
            reference_time,
            max_path_length,
            trust_anchor: None,
            policy_mapping_inhibited: false,
            explicit_policy_required: false,
            any_policy_inhibited: false,
            check_revocation_status: false,
            initial_policy_set: default_initial_policy_set(),
        }
    }

    gets_and_withs!(reference_time, TimeOfInterest);
    gets_and_withs!(max_path_length, u32);
    gets_and_withs!(policy_mapping_inhibited, bool);
    gets_and_withs!(explicit_policy_required, bool);
    gets_and_withs!(any_policy_inhibited, bool);
    gets_and_withs!(check_revocation_status, bool);
    gets_and_withs!(initial_policy_set, ObjectIdentifierSet);

    /// `trust_anchor` returns the trust anchor override, if any. When absent, the first certificate
    /// in the certification path serves as the trust anchor.
    pub fn trust_anchor(&self) -> Option<&PathCertificate> {
        self.trust_anchor.as_ref()
    }

    /// `with_trust_anchor` returns a copy of this instance with the given trust anchor override
    #[must_use]
    pub fn with_trust_anchor(&self, trust_anchor: PathCertificate) -> Self {
        Self {
            trust_anchor: Some(trust_anchor),
            ..self.clone()
        }
    }

    /// `without_trust_anchor` returns a copy of this instance with no trust anchor override
    #[must_use]
    pub fn without_trust_anchor(&self) -> Self {
        Self {
            trust_anchor: None,
            ..self.clone()
        }
    }

    /// `to_json` returns a JSON representation of this instance
    #[cfg(feature = "std")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            error!("Failed to serialize validation configuration: {}", e);
            Error::ParseError
        })
    }
}

/// `read_config` reads a JSON-encoded [`ValidationConfig`] from the file at the given path.
#[cfg(feature = "std")]
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<ValidationConfig> {
    let json = std::fs::read(path.as_ref())?;
    serde_json::from_slice(&json).map_err(|e| {
        error!(
            "Failed to parse validation configuration from {}: {}",
            path.as_ref().display(),
            e
        );
        Error::ParseError
    })
}

#[cfg(feature = "std")]
mod oid_set_serde {
    use super::*;
    use alloc::vec::Vec;
    use core::str::FromStr;
    use serde::{de, Deserializer, Serializer};

    pub(super) fn serialize<S>(set: &ObjectIdentifierSet, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(set.iter().map(|oid| oid.to_string()))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> core::result::Result<ObjectIdentifierSet, D::Error>
    where
        D: Deserializer<'de>,
    {
        let strings: Vec<String> = Deserialize::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| {
                ObjectIdentifier::from_str(s)
                    .map_err(|_| de::Error::custom(format!("invalid object identifier: {s}")))
            })
            .collect()
    }
}
