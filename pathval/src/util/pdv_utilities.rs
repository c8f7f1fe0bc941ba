//! Utility functions that support certification path processing

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use log::{debug, error};

#[cfg(feature = "std")]
use lazy_static::lazy_static;

#[cfg(feature = "std")]
use regex::Regex;

use der::asn1::{Ia5String, PrintableString, Utf8StringRef};
use const_oid::db::rfc3280::EMAIL_ADDRESS;
use der::Tagged;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RelativeDistinguishedName};
use x509_cert::{Certificate, TbsCertificate};

use crate::{util::error::*, util::time_of_interest::TimeOfInterest};

#[cfg(feature = "std")]
lazy_static! {
    static ref WHITESPACE_RE: Option<Regex> = Regex::new(r"\s+").ok();
}

/// `is_self_issued` returns true if the subject field in the certificate is the same as the issuer
/// field.
pub fn is_self_issued(cert: &Certificate) -> bool {
    compare_names(&cert.tbs_certificate.issuer, &cert.tbs_certificate.subject)
}

/// `valid_at_time` checks that the time of interest falls within the validity period of the
/// certificate. The not_before field is evaluated first.
///
/// To stifle logging output upon error, pass true for the stifle_log parameter.
pub fn valid_at_time(
    target: &TbsCertificate,
    toi: &TimeOfInterest,
    stifle_log: bool,
) -> core::result::Result<(), PathValidationStatus> {
    if *toi < target.validity.not_before {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                "certificate is not yet valid, i.e., not_before is after the configured time of interest",
            );
        }
        return Err(PathValidationStatus::NotYetValid);
    }

    if *toi > target.validity.not_after {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                &alloc::format!(
                    "certificate is expired relative to the configured time of interest: {}",
                    target.validity.not_after
                ),
            );
        }
        return Err(PathValidationStatus::CertificateExpired);
    }
    Ok(())
}

/// `name_to_string` returns a string representation of given Name value.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

pub(crate) fn log_error_for_name(name: &Name, msg: &str) {
    error!(
        "Encountered error while processing certificate with subject {}: {}",
        name_to_string(name),
        msg
    );
}

/// log a message with subject name of the certificate appended
pub fn log_error_for_subject(cert: &Certificate, msg: &str) {
    log_error_for_name(&cert.tbs_certificate.subject, msg);
}

/// `attribute_value_to_string` returns the value of a string-typed attribute, or None for other types.
fn attribute_value_to_string(atav: &AttributeTypeAndValue) -> Option<String> {
    match atav.value.tag() {
        der::Tag::PrintableString => atav
            .value
            .decode_as()
            .ok()
            .map(|s: PrintableString| s.to_string()),
        der::Tag::Utf8String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Utf8StringRef<'_>| s.to_string()),
        der::Tag::Ia5String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Ia5String| s.to_string()),
        _ => None,
    }
}

/// `email_addresses_in_name` returns the values of any emailAddress attributes in name. Values that
/// cannot be represented as an IA5String are skipped.
pub(crate) fn email_addresses_in_name(name: &Name) -> Vec<Ia5String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .filter(|atav| atav.oid == EMAIL_ADDRESS)
        .filter_map(attribute_value_to_string)
        .filter_map(|s| Ia5String::new(&s).ok())
        .collect()
}

/// lower case, trim and collapse internal whitespace
fn normalize_attribute_value(value: &str) -> String {
    let value = value.trim().to_lowercase();
    #[cfg(feature = "std")]
    if let Some(re) = WHITESPACE_RE.as_ref() {
        return re.replace_all(value.as_str(), " ").to_string();
    }
    value
}

fn compare_attributes(left: &AttributeTypeAndValue, right: &AttributeTypeAndValue) -> bool {
    if left.oid != right.oid {
        return false;
    }
    if left.value == right.value {
        return true;
    }
    match (
        attribute_value_to_string(left),
        attribute_value_to_string(right),
    ) {
        (Some(l), Some(r)) => normalize_attribute_value(&l) == normalize_attribute_value(&r),
        _ => false,
    }
}

fn compare_rdns(left: &RelativeDistinguishedName, right: &RelativeDistinguishedName) -> bool {
    if left == right {
        return true;
    }
    if left.0.len() != right.0.len() {
        return false;
    }
    // only do the whitespace and case insensitive comparison if the simpler compare fails
    left.0
        .iter()
        .zip(right.0.iter())
        .all(|(l, r)| compare_attributes(l, r))
}

/// [`compare_names`] compares two Name values returning true if they match and false otherwise.
/// Attribute values are compared without regard to case, leading or trailing whitespace or
/// (with the std feature) runs of internal whitespace.
pub fn compare_names(left: &Name, right: &Name) -> bool {
    // no match if not the same number of RDNs
    if left.0.len() != right.0.len() {
        return false;
    }
    left.0
        .iter()
        .zip(right.0.iter())
        .all(|(l, r)| compare_rdns(l, r))
}

/// `descended_from_dn` returns true if name is equal to or subordinate to subtree, with the number
/// of additional RDNs falling within min and max.
pub(crate) fn descended_from_dn(subtree: &Name, name: &Name, min: u32, max: Option<u32>) -> bool {
    //if descendant fewer rdns then it is not a descendant
    if subtree.0.len() > name.0.len() {
        return false;
    }

    let diff = (name.0.len() - subtree.0.len()) as u32;
    if diff < min {
        return false;
    }
    if let Some(max) = max {
        if diff > max {
            return false;
        }
    }

    for (l, r) in subtree.0.iter().zip(name.0.iter()) {
        if !compare_rdns(l, r) {
            return false;
        }
        if l != r {
            debug!("Permitting a DN name constraint match despite differences in case, whitespace or character set");
        }
    }
    true
}

/// `descended_from_host` returns true if host is equal to or subordinate to the constraint. For URI
/// constraints, only a constraint beginning with a period matches subordinate hosts.
pub(crate) fn descended_from_host(constraint: &str, host: &str, is_uri: bool) -> bool {
    let constraint = constraint.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    if constraint.is_empty() {
        return true;
    }

    if constraint.starts_with('.') {
        return host.ends_with(constraint.as_str());
    }

    if host == constraint {
        return true;
    }

    if is_uri {
        return false;
    }

    host.ends_with(constraint.as_str())
        && host.as_bytes()[host.len() - constraint.len() - 1] == b'.'
}

/// `descended_from_rfc822` returns true if addr is within the rfc822Name constraint, which may name
/// a mailbox, a host or (with a leading period) a domain.
pub(crate) fn descended_from_rfc822(constraint: &str, addr: &str) -> bool {
    if constraint.contains('@') {
        return match (constraint.rsplit_once('@'), addr.rsplit_once('@')) {
            (Some((cl, ch)), Some((al, ah))) => cl == al && ch.eq_ignore_ascii_case(ah),
            _ => false,
        };
    }

    let host = match addr.rsplit_once('@') {
        Some((_, host)) => host.to_ascii_lowercase(),
        None => return false,
    };
    let constraint = constraint.to_ascii_lowercase();

    if constraint.starts_with('.') {
        host.ends_with(constraint.as_str())
    } else {
        host == constraint
    }
}
