//! Wrappers around decoded extension structures to support certification path processing

use alloc::collections::BTreeMap;

use der::asn1::ObjectIdentifier;
use x509_cert::ext::pkix::*;

use crate::util::error::*;

/// The [`ExtensionProcessing`] trait provides a common means of extracting extensions from objects that
/// feature extensions and that retain copies of the decoded extension structures, like [`PathCertificate`](crate::PathCertificate).
///
/// Extensions are decoded when the object is created. The decoded extensions are cached and accessed
/// via the get_extension function.
pub trait ExtensionProcessing {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns a
    /// previously parsed [`PathExtension`] instance containing the decoded extension if the extension
    /// was present.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Option<&'_ PathExtension>;

    /// `parse_extension` takes an ObjectIdentifier that identifies an extension type, decodes the
    /// extension if it is present and caches the result.
    fn parse_extension(&'_ mut self, oid: &ObjectIdentifier) -> Result<Option<&'_ PathExtension>>;

    /// `parse_extensions` decodes and caches each extension in the list that is present.
    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]) -> Result<()>;
}

/// [`ParsedExtensions`] is a typedef of a BTreeMap map that associates [`PathExtension`] objects with
/// object identifier values. This is used to avoid parsing extensions repeatedly when performing
/// certification path processing.
pub type ParsedExtensions = BTreeMap<ObjectIdentifier, PathExtension>;

/// [`PathExtension`] provides a wrapper for the extension types that influence certification path
/// validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathExtension {
    /// Parsed BasicConstraints extension
    BasicConstraints(BasicConstraints),
    /// Parsed KeyUsage extension
    KeyUsage(KeyUsage),
    /// Parsed ExtendedKeyUsage extension
    ExtendedKeyUsage(ExtendedKeyUsage),
    /// Parsed SubjectKeyIdentifier extension
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    /// Parsed AuthorityKeyIdentifier extension
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    /// Parsed SubjectAltName extension
    SubjectAltName(SubjectAltName),
    /// Parsed NameConstraints extension
    NameConstraints(NameConstraints),
    /// Parsed CertificatePolicies extension
    CertificatePolicies(CertificatePolicies),
    /// Parsed PolicyMappings extension
    PolicyMappings(PolicyMappings),
    /// Parsed PolicyConstraints extension
    PolicyConstraints(PolicyConstraints),
    /// Parsed InhibitAnyPolicy extension
    InhibitAnyPolicy(InhibitAnyPolicy),
}
