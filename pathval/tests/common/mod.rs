//! Helpers for building certification paths in tests. Certificates are signed with a mock
//! algorithm whose signature is the SHA-256 digest of the issuer's public key followed by the
//! TBSCertificate, so no private keys are involved.
#![allow(dead_code)]

use std::str::FromStr;
use std::time::Duration;

use const_oid::db::rfc5280::ANY_POLICY;
use const_oid::db::rfc5912::{
    ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES, ID_CE_INHIBIT_ANY_POLICY,
    ID_CE_KEY_USAGE, ID_CE_NAME_CONSTRAINTS, ID_CE_POLICY_CONSTRAINTS, ID_CE_POLICY_MAPPINGS,
    ID_CE_SUBJECT_ALT_NAME,
};
use der::asn1::{BitString, ObjectIdentifier, OctetString, UtcTime};
use der::{Any, Encode};
use flagset::FlagSet;
use sha2::{Digest, Sha256};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::constraints::name::GeneralSubtree;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    BasicConstraints, CertificatePolicies, InhibitAnyPolicy, KeyUsage, KeyUsages, NameConstraints,
    PolicyConstraints, PolicyMapping, PolicyMappings, SubjectAltName,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate, TbsCertificate, Version};

use pathval::*;

/// Mock signature algorithm
pub const MOCK_SIGNATURE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.55555.1.1");
/// Mock public key algorithm
pub const MOCK_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.55555.1.2");
/// A second mock public key algorithm
pub const MOCK_KEY2: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.55555.1.3");

pub const P1: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.48.1");
pub const P2: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.48.2");
pub const P3: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.2.1.48.3");

/// Reference time used by tests, 2023-11-14
pub const TOI: u64 = 1_700_000_000;
/// Default notBefore, 2020-09-13
pub const NOT_BEFORE: u64 = 1_600_000_000;
/// Default notAfter, 2027-01-15
pub const NOT_AFTER: u64 = 1_800_000_000;

pub const ROOT: &str = "CN=Test Root,O=Test,C=US";
pub const ICA: &str = "CN=Test ICA,O=Test,C=US";
pub const ICA2: &str = "CN=Test ICA 2,O=Test,C=US";
pub const EE: &str = "CN=Test EE,O=Test,C=US";

pub fn config() -> ValidationConfig {
    ValidationConfig::new(TimeOfInterest::from_unix_secs(TOI).unwrap(), 5)
}

/// mock public key for the named entity
pub fn key_for(name: &str) -> Vec<u8> {
    Sha256::digest(name.as_bytes()).to_vec()
}

fn mock_sign(issuer_key: &[u8], tbs: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(issuer_key);
    hasher.update(tbs);
    hasher.finalize().to_vec()
}

/// `verify_mock` implements the VerifySignatureMessage interface for the mock signature algorithm
pub fn verify_mock(
    _pe: &PkiEnvironment,
    message_to_verify: &[u8],
    signature: &[u8],
    signature_alg: &AlgorithmIdentifierOwned,
    spki: &SubjectPublicKeyInfoOwned,
) -> pathval::Result<()> {
    if signature_alg.oid != MOCK_SIGNATURE {
        return Err(Error::Unrecognized);
    }
    if mock_sign(spki.subject_public_key.raw_bytes(), message_to_verify) == signature {
        Ok(())
    } else {
        Err(Error::path_validation(
            PathValidationStatus::SignatureInvalid,
            0,
            String::new(),
        ))
    }
}

/// PkiEnvironment that verifies mock signatures
pub fn mock_environment() -> PkiEnvironment {
    let mut pe = PkiEnvironment::new();
    pe.add_verify_signature_message_callback(verify_mock);
    pe.add_validate_path_callback(validate_path_rfc5280);
    pe
}

pub fn time(secs: u64) -> Time {
    Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(secs)).unwrap())
}

pub fn ext<T: Encode>(oid: ObjectIdentifier, critical: bool, value: &T) -> Extension {
    Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(value.to_der().unwrap()).unwrap(),
    }
}

pub fn basic_constraints(ca: bool, path_len_constraint: Option<u8>) -> Extension {
    ext(
        ID_CE_BASIC_CONSTRAINTS,
        true,
        &BasicConstraints {
            ca,
            path_len_constraint,
        },
    )
}

pub fn key_usage(ku: FlagSet<KeyUsages>) -> Extension {
    ext(ID_CE_KEY_USAGE, true, &KeyUsage(ku))
}

pub fn certificate_policies(policies: &[ObjectIdentifier]) -> Extension {
    let cps = CertificatePolicies(
        policies
            .iter()
            .map(|p| PolicyInformation {
                policy_identifier: *p,
                policy_qualifiers: None,
            })
            .collect(),
    );
    ext(ID_CE_CERTIFICATE_POLICIES, false, &cps)
}

pub fn any_policy() -> Extension {
    certificate_policies(&[ANY_POLICY])
}

pub fn policy_mappings(mappings: &[(ObjectIdentifier, ObjectIdentifier)]) -> Extension {
    let pm = PolicyMappings(
        mappings
            .iter()
            .map(|(issuer, subject)| PolicyMapping {
                issuer_domain_policy: *issuer,
                subject_domain_policy: *subject,
            })
            .collect(),
    );
    ext(ID_CE_POLICY_MAPPINGS, true, &pm)
}

pub fn policy_constraints(
    require_explicit_policy: Option<u32>,
    inhibit_policy_mapping: Option<u32>,
) -> Extension {
    ext(
        ID_CE_POLICY_CONSTRAINTS,
        true,
        &PolicyConstraints {
            require_explicit_policy,
            inhibit_policy_mapping,
        },
    )
}

pub fn inhibit_any_policy(skip_certs: u32) -> Extension {
    ext(ID_CE_INHIBIT_ANY_POLICY, true, &InhibitAnyPolicy(skip_certs))
}

pub fn subtree(base: GeneralName) -> GeneralSubtree {
    GeneralSubtree {
        base,
        minimum: 0,
        maximum: None,
    }
}

pub fn dn_subtree(dn: &str) -> GeneralSubtree {
    subtree(GeneralName::DirectoryName(Name::from_str(dn).unwrap()))
}

pub fn name_constraints(
    permitted: Option<Vec<GeneralSubtree>>,
    excluded: Option<Vec<GeneralSubtree>>,
) -> Extension {
    ext(
        ID_CE_NAME_CONSTRAINTS,
        true,
        &NameConstraints {
            permitted_subtrees: permitted,
            excluded_subtrees: excluded,
        },
    )
}

pub fn subject_alt_name(names: Vec<GeneralName>) -> Extension {
    ext(ID_CE_SUBJECT_ALT_NAME, false, &SubjectAltName(names))
}

/// `TestCert` describes a certificate to be generated for a test
#[derive(Clone)]
pub struct TestCert {
    pub subject: String,
    pub issuer: String,
    pub issuer_key: Vec<u8>,
    pub serial: u8,
    pub not_before: u64,
    pub not_after: u64,
    pub version: Version,
    pub key_algorithm: ObjectIdentifier,
    pub key_parameters: Option<Any>,
    pub extensions: Vec<Extension>,
}

impl TestCert {
    /// v3 certificate with no extensions, signed with the issuer's mock key
    pub fn new(subject: &str, issuer: &str) -> Self {
        TestCert {
            subject: subject.to_string(),
            issuer: issuer.to_string(),
            issuer_key: key_for(issuer),
            serial: 1,
            not_before: NOT_BEFORE,
            not_after: NOT_AFTER,
            version: Version::V3,
            key_algorithm: MOCK_KEY,
            key_parameters: None,
            extensions: vec![],
        }
    }

    /// self-signed CA certificate
    pub fn root(subject: &str) -> Self {
        Self::ca(subject, subject)
    }

    /// CA certificate with basicConstraints and keyUsage
    pub fn ca(subject: &str, issuer: &str) -> Self {
        Self::new(subject, issuer)
            .with_extension(basic_constraints(true, None))
            .with_extension(key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign))
    }

    /// end entity certificate
    pub fn ee(subject: &str, issuer: &str) -> Self {
        Self::new(subject, issuer).with_extension(key_usage(KeyUsages::DigitalSignature.into()))
    }

    pub fn with_extension(mut self, ext: Extension) -> Self {
        self.extensions.retain(|e| e.extn_id != ext.extn_id);
        self.extensions.push(ext);
        self
    }

    pub fn without_extension(mut self, oid: ObjectIdentifier) -> Self {
        self.extensions.retain(|e| e.extn_id != oid);
        self
    }

    pub fn with_validity(mut self, not_before: u64, not_after: u64) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn signed_with_key_of(mut self, name: &str) -> Self {
        self.issuer_key = key_for(name);
        self
    }

    pub fn with_key_algorithm(mut self, oid: ObjectIdentifier, parameters: Option<Any>) -> Self {
        self.key_algorithm = oid;
        self.key_parameters = parameters;
        self
    }

    pub fn with_serial(mut self, serial: u8) -> Self {
        self.serial = serial;
        self
    }

    /// TBSCertificate with the given subject public key and signature algorithm
    pub fn tbs(
        &self,
        spki: SubjectPublicKeyInfoOwned,
        signature: AlgorithmIdentifierOwned,
    ) -> TbsCertificate {
        TbsCertificate {
            version: self.version,
            serial_number: SerialNumber::new(&[self.serial]).unwrap(),
            signature,
            issuer: Name::from_str(&self.issuer).unwrap(),
            validity: Validity {
                not_before: time(self.not_before),
                not_after: time(self.not_after),
            },
            subject: Name::from_str(&self.subject).unwrap(),
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if self.extensions.is_empty() {
                None
            } else {
                Some(self.extensions.clone())
            },
        }
    }

    /// builds the certificate using the mock signature algorithm
    pub fn build(&self) -> PathCertificate {
        let spki = SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: self.key_algorithm,
                parameters: self.key_parameters.clone(),
            },
            subject_public_key: BitString::from_bytes(&key_for(&self.subject)).unwrap(),
        };
        let alg = AlgorithmIdentifierOwned {
            oid: MOCK_SIGNATURE,
            parameters: None,
        };
        let tbs = self.tbs(spki, alg.clone());
        let signature = mock_sign(&self.issuer_key, &tbs.to_der().unwrap());
        sign_and_wrap(tbs, alg, &signature)
    }
}

/// assembles a Certificate from its parts and wraps it in a PathCertificate
pub fn sign_and_wrap(
    tbs: TbsCertificate,
    signature_algorithm: AlgorithmIdentifierOwned,
    signature: &[u8],
) -> PathCertificate {
    let cert = Certificate {
        tbs_certificate: tbs,
        signature_algorithm,
        signature: BitString::from_bytes(signature).unwrap(),
    };
    PathCertificate::try_from(cert).unwrap()
}

/// trust anchor, intermediate CA and end entity
pub fn three_cert_path() -> Vec<PathCertificate> {
    vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT).build(),
        TestCert::ee(EE, ICA).build(),
    ]
}

/// asserts that the result is a path validation failure with the given status and index
pub fn assert_failure(
    result: pathval::Result<ValidationResult>,
    status: PathValidationStatus,
    index: usize,
) {
    match result {
        Err(Error::PathValidation(failure)) => {
            assert_eq!(status, failure.status, "unexpected status: {:?}", failure);
            assert_eq!(index, failure.index, "unexpected index: {:?}", failure);
        }
        Err(e) => panic!("expected {:?} at {}, got {:?}", status, index, e),
        Ok(_) => panic!("expected {:?} at {}, validation succeeded", status, index),
    }
}
