//! Reference time against which certificate validity periods are evaluated

use core::{cmp::Ordering, fmt, time::Duration};

/// Time of interest for a validation operation, i.e., the reference time that must fall within the
/// validity period of every certificate in a certification path.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct TimeOfInterest(pub der::DateTime);

impl fmt::Display for TimeOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TimeOfInterest {
    /// Create a [`TimeOfInterest`] from Unix epoch
    pub fn from_unix_secs(v: u64) -> der::Result<Self> {
        Ok(Self(der::DateTime::from_unix_duration(
            Duration::from_secs(v),
        )?))
    }

    /// Return Unix epoch (in seconds) for this value
    pub fn as_unix_secs(&self) -> u64 {
        self.0.unix_duration().as_secs()
    }
}

impl PartialEq<x509_cert::time::Time> for TimeOfInterest {
    fn eq(&self, other: &x509_cert::time::Time) -> bool {
        self.0.eq(&other.to_date_time())
    }
}

impl PartialOrd<x509_cert::time::Time> for TimeOfInterest {
    fn partial_cmp(&self, other: &x509_cert::time::Time) -> Option<Ordering> {
        self.0.partial_cmp(&other.to_date_time())
    }
}

impl PartialEq<TimeOfInterest> for x509_cert::time::Time {
    fn eq(&self, other: &TimeOfInterest) -> bool {
        self.to_date_time().eq(&other.0)
    }
}

impl PartialOrd<TimeOfInterest> for x509_cert::time::Time {
    fn partial_cmp(&self, other: &TimeOfInterest) -> Option<Ordering> {
        self.to_date_time().partial_cmp(&other.0)
    }
}

#[cfg(feature = "std")]
mod std {
    use super::*;
    use serde::{
        de::{self, Deserializer, Visitor},
        ser::Serializer,
        Deserialize, Serialize,
    };

    impl Serialize for TimeOfInterest {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_u64(self.as_unix_secs())
        }
    }

    impl<'de> Deserialize<'de> for TimeOfInterest {
        fn deserialize<D>(deserializer: D) -> Result<TimeOfInterest, D::Error>
        where
            D: Deserializer<'de>,
        {
            struct ToiVisitor;

            impl<'de> Visitor<'de> for ToiVisitor {
                type Value = TimeOfInterest;

                fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                    formatter.write_str("seconds since the Unix epoch")
                }

                fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
                where
                    E: de::Error,
                {
                    TimeOfInterest::from_unix_secs(value)
                        .map_err(|_| E::custom(format!("time of interest out of range: {value}")))
                }
            }

            deserializer.deserialize_u64(ToiVisitor)
        }
    }

    impl TimeOfInterest {
        /// Creates a [`TimeOfInterest`] for the current system time
        pub fn now() -> der::Result<Self> {
            Ok(Self(der::DateTime::from_system_time(
                ::std::time::SystemTime::now(),
            )?))
        }
    }
}

#[test]
fn toi_compare_test() {
    use x509_cert::time::Time;

    let toi = TimeOfInterest::from_unix_secs(1_700_000_000).unwrap();
    assert_eq!(1_700_000_000, toi.as_unix_secs());

    let earlier = Time::GeneralTime(
        der::asn1::GeneralizedTime::from_unix_duration(Duration::from_secs(1_600_000_000))
            .unwrap(),
    );
    let later = Time::GeneralTime(
        der::asn1::GeneralizedTime::from_unix_duration(Duration::from_secs(1_800_000_000))
            .unwrap(),
    );
    assert!(earlier <= toi);
    assert!(toi <= later);
    assert!(toi > earlier);
}
