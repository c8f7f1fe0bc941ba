//! The outputs of a successful certification path validation operation

use alloc::vec::Vec;

use der::asn1::{BitString, ObjectIdentifier};
use der::Any;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::ext::pkix::certpolicy::PolicyInformation;

use crate::{PathCertificate, PolicyTree, ValidatorState};

/// [`ValidationResult`] holds the outputs described in [RFC 5280 Section 6.1.6] along with the
/// certification path that was validated. Fields are public for reading only.
///
/// [RFC 5280 Section 6.1.6]: <https://datatracker.ietf.org/doc/html/rfc5280#section-6.1.6>
#[readonly::make]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationResult {
    /// Certification path that was validated, with the target certificate last
    pub certificates: Vec<PathCertificate>,
    /// Final valid_policy_tree, or None if the tree was NULL
    pub valid_policy_tree: Option<PolicyTree>,
    /// Algorithm of the target certificate's public key
    pub working_public_key_algorithm: ObjectIdentifier,
    /// Target certificate's public key
    pub working_public_key: BitString,
    /// Parameters of the target certificate's public key, possibly inherited
    pub working_public_key_parameters: Option<Any>,
}

impl ValidationResult {
    pub(crate) fn new(certificates: Vec<PathCertificate>, state: &ValidatorState) -> Self {
        ValidationResult {
            certificates,
            valid_policy_tree: state.valid_policy_tree.clone(),
            working_public_key_algorithm: state.working_public_key_algorithm,
            working_public_key: state.working_public_key.clone(),
            working_public_key_parameters: state.working_public_key_parameters.clone(),
        }
    }

    /// Target certificate
    pub fn certificate(&self) -> Option<&PathCertificate> {
        self.certificates.last()
    }

    /// `policies` returns the policies from the valid_policy_tree at the depth of the target
    /// certificate, or an empty list if the tree is NULL.
    pub fn policies(&self) -> Vec<PolicyInformation> {
        match &self.valid_policy_tree {
            Some(tree) => tree.policies_at_depth(self.certificates.len()),
            None => Vec::new(),
        }
    }

    /// Working public key, algorithm and parameters as a SubjectPublicKeyInfo
    pub fn subject_public_key_info(&self) -> SubjectPublicKeyInfoOwned {
        SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: self.working_public_key_algorithm,
                parameters: self.working_public_key_parameters.clone(),
            },
            subject_public_key: self.working_public_key.clone(),
        }
    }
}
