//! Wrapper around a decoded certificate that serves the accessors used during certification path
//! processing

use alloc::{string::String, vec::Vec};

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_EXT_KEY_USAGE, ID_CE_INHIBIT_ANY_POLICY, ID_CE_KEY_USAGE, ID_CE_NAME_CONSTRAINTS,
    ID_CE_POLICY_CONSTRAINTS, ID_CE_POLICY_MAPPINGS, ID_CE_SUBJECT_ALT_NAME,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
};
use der::asn1::{BitString, ObjectIdentifier};
use der::{Decode, Encode};
use log::error;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::ext::pkix::*;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::time::Validity;
use x509_cert::{Certificate, Version};

use crate::util::error::*;
use crate::util::pdv_utilities::{is_self_issued, name_to_string};
use crate::validator::path_extension::*;

/// `EXTS_OF_INTEREST` lists the extensions that are decoded when a [`PathCertificate`] is created.
/// These are also the extensions that may be marked critical without causing path validation to fail.
pub const EXTS_OF_INTEREST: &[ObjectIdentifier] = &[
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_KEY_USAGE,
    ID_CE_EXT_KEY_USAGE,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
    ID_CE_AUTHORITY_KEY_IDENTIFIER,
    ID_CE_SUBJECT_ALT_NAME,
    ID_CE_NAME_CONSTRAINTS,
    ID_CE_CERTIFICATE_POLICIES,
    ID_CE_POLICY_MAPPINGS,
    ID_CE_POLICY_CONSTRAINTS,
    ID_CE_INHIBIT_ANY_POLICY,
];

/// [`PathCertificate`] aggregates a binary, DER-encoded Certificate, the decoded Certificate and the
/// decoded extensions listed in [`EXTS_OF_INTEREST`]. Instances are never modified once created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathCertificate {
    encoded_cert: Vec<u8>,
    decoded_cert: Certificate,
    parsed_extensions: ParsedExtensions,
}

impl TryFrom<&[u8]> for PathCertificate {
    type Error = Error;

    fn try_from(enc_cert: &[u8]) -> Result<Self> {
        let cert = match Certificate::from_der(enc_cert) {
            Ok(cert) => cert,
            Err(e) => {
                error!("Failed to parse certificate: {}", e);
                return Err(Error::Asn1Error(e));
            }
        };
        let mut path_cert = PathCertificate {
            encoded_cert: enc_cert.to_vec(),
            decoded_cert: cert,
            parsed_extensions: ParsedExtensions::new(),
        };
        path_cert.parse_extensions(EXTS_OF_INTEREST)?;
        Ok(path_cert)
    }
}

impl TryFrom<Certificate> for PathCertificate {
    type Error = Error;

    fn try_from(cert: Certificate) -> Result<Self> {
        let enc_cert = cert.to_der()?;
        let mut path_cert = PathCertificate {
            encoded_cert: enc_cert,
            decoded_cert: cert,
            parsed_extensions: ParsedExtensions::new(),
        };
        path_cert.parse_extensions(EXTS_OF_INTEREST)?;
        Ok(path_cert)
    }
}

impl PathCertificate {
    /// Binary, DER-encoded Certificate
    pub fn encoded_cert(&self) -> &[u8] {
        &self.encoded_cert
    }

    /// Decoded Certificate
    pub fn decoded_cert(&self) -> &Certificate {
        &self.decoded_cert
    }

    /// Subject name
    pub fn subject(&self) -> &Name {
        &self.decoded_cert.tbs_certificate.subject
    }

    /// Subject name as a string, for diagnostics
    pub fn subject_string(&self) -> String {
        name_to_string(self.subject())
    }

    /// Issuer name
    pub fn issuer(&self) -> &Name {
        &self.decoded_cert.tbs_certificate.issuer
    }

    /// Validity period
    pub fn validity(&self) -> &Validity {
        &self.decoded_cert.tbs_certificate.validity
    }

    /// Subject public key info, i.e., the algorithm, optional parameters and the key
    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.decoded_cert.tbs_certificate.subject_public_key_info
    }

    /// Signature algorithm from the TBSCertificate
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.decoded_cert.tbs_certificate.signature
    }

    /// True if the subject and issuer names match
    pub fn is_self_issued(&self) -> bool {
        is_self_issued(&self.decoded_cert)
    }

    /// True if the certificate is an X.509 version 3 certificate
    pub fn is_version_3(&self) -> bool {
        self.decoded_cert.tbs_certificate.version == Version::V3
    }

    /// Extensions marked critical
    pub fn critical_extensions(&self) -> impl Iterator<Item = &Extension> {
        self.decoded_cert
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.critical)
    }

    /// Decoded basicConstraints extension, if present
    pub fn basic_constraints(&self) -> Option<&BasicConstraints> {
        match self.get_extension(&ID_CE_BASIC_CONSTRAINTS) {
            Some(PathExtension::BasicConstraints(bc)) => Some(bc),
            _ => None,
        }
    }

    /// Decoded keyUsage extension, if present
    pub fn key_usage(&self) -> Option<&KeyUsage> {
        match self.get_extension(&ID_CE_KEY_USAGE) {
            Some(PathExtension::KeyUsage(ku)) => Some(ku),
            _ => None,
        }
    }

    /// Decoded certificatePolicies extension, if present
    pub fn certificate_policies(&self) -> Option<&CertificatePolicies> {
        match self.get_extension(&ID_CE_CERTIFICATE_POLICIES) {
            Some(PathExtension::CertificatePolicies(cp)) => Some(cp),
            _ => None,
        }
    }

    /// Decoded policyMappings extension, if present
    pub fn policy_mappings(&self) -> Option<&PolicyMappings> {
        match self.get_extension(&ID_CE_POLICY_MAPPINGS) {
            Some(PathExtension::PolicyMappings(pm)) => Some(pm),
            _ => None,
        }
    }

    /// Decoded policyConstraints extension, if present
    pub fn policy_constraints(&self) -> Option<&PolicyConstraints> {
        match self.get_extension(&ID_CE_POLICY_CONSTRAINTS) {
            Some(PathExtension::PolicyConstraints(pc)) => Some(pc),
            _ => None,
        }
    }

    /// Decoded inhibitAnyPolicy extension, if present
    pub fn inhibit_any_policy(&self) -> Option<&InhibitAnyPolicy> {
        match self.get_extension(&ID_CE_INHIBIT_ANY_POLICY) {
            Some(PathExtension::InhibitAnyPolicy(iap)) => Some(iap),
            _ => None,
        }
    }

    /// Decoded nameConstraints extension, if present
    pub fn name_constraints(&self) -> Option<&NameConstraints> {
        match self.get_extension(&ID_CE_NAME_CONSTRAINTS) {
            Some(PathExtension::NameConstraints(nc)) => Some(nc),
            _ => None,
        }
    }

    /// Decoded subjectAltName extension, if present
    pub fn subject_alt_name(&self) -> Option<&SubjectAltName> {
        match self.get_extension(&ID_CE_SUBJECT_ALT_NAME) {
            Some(PathExtension::SubjectAltName(san)) => Some(san),
            _ => None,
        }
    }
}

impl ExtensionProcessing for PathCertificate {
    fn get_extension(&self, oid: &ObjectIdentifier) -> Option<&'_ PathExtension> {
        self.parsed_extensions.get(oid)
    }

    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]) -> Result<()> {
        for oid in oids {
            self.parse_extension(oid)?;
        }
        Ok(())
    }

    fn parse_extension(&mut self, oid: &ObjectIdentifier) -> Result<Option<&PathExtension>> {
        macro_rules! add_and_return {
            ($pe:ident, $v:ident, $t:ident) => {
                match $t::from_der($v) {
                    Ok(r) => {
                        $pe.insert(*oid, PathExtension::$t(r));
                        return Ok($pe.get(oid));
                    }
                    Err(e) => {
                        error!("Failed to parse extension {}: {}", oid, e);
                        return Err(Error::Asn1Error(e));
                    }
                }
            };
        }

        let pe = &mut self.parsed_extensions;
        if pe.contains_key(oid) {
            return Ok(pe.get(oid));
        }

        if let Some(exts) = self.decoded_cert.tbs_certificate.extensions.as_ref() {
            if let Some(i) = exts.iter().find(|&ext| ext.extn_id == *oid) {
                let v = i.extn_value.as_bytes();
                match *oid {
                    ID_CE_BASIC_CONSTRAINTS => {
                        add_and_return!(pe, v, BasicConstraints);
                    }
                    ID_CE_KEY_USAGE => {
                        add_and_return!(pe, v, KeyUsage);
                    }
                    ID_CE_EXT_KEY_USAGE => {
                        add_and_return!(pe, v, ExtendedKeyUsage);
                    }
                    ID_CE_SUBJECT_KEY_IDENTIFIER => {
                        add_and_return!(pe, v, SubjectKeyIdentifier);
                    }
                    ID_CE_AUTHORITY_KEY_IDENTIFIER => {
                        add_and_return!(pe, v, AuthorityKeyIdentifier);
                    }
                    ID_CE_SUBJECT_ALT_NAME => {
                        add_and_return!(pe, v, SubjectAltName);
                    }
                    ID_CE_NAME_CONSTRAINTS => {
                        add_and_return!(pe, v, NameConstraints);
                    }
                    ID_CE_CERTIFICATE_POLICIES => {
                        add_and_return!(pe, v, CertificatePolicies);
                    }
                    ID_CE_POLICY_MAPPINGS => {
                        add_and_return!(pe, v, PolicyMappings);
                    }
                    ID_CE_POLICY_CONSTRAINTS => {
                        add_and_return!(pe, v, PolicyConstraints);
                    }
                    ID_CE_INHIBIT_ANY_POLICY => {
                        add_and_return!(pe, v, InhibitAnyPolicy);
                    }
                    _ => {
                        // ignore unrecognized
                    }
                }
            }
        }
        Ok(None)
    }
}

/// [`DeferDecodeSigned`] used to parse only the top-level Certificate structure, without parsing the details of the
/// TBSCertificate, AlgorithmIdentifier or BIT STRING fields.
///
/// Deferred decoding is used when verifying certificates to avoid re-encoding the TBSCertificate
/// (and potentially encountering problems with structures that were not DER-encoded prior to signing).
pub struct DeferDecodeSigned {
    /// tbsCertificate       TBSCertificate,
    pub tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// signature            BIT STRING
    pub signature: BitString,
}

impl ::der::FixedTag for DeferDecodeSigned {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeSigned {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_certificate = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_certificate.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}
