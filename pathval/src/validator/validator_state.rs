//! The working state variables maintained during certification path validation

use der::asn1::{BitString, ObjectIdentifier};
use der::Any;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::name::Name;

use pkiprocmacros::*;

use crate::{NameConstraintsSet, PathCertificate, PolicyTree, ValidationConfig};

/// [`ValidatorState`] is a snapshot of the state variables described in [RFC 5280 Section 6.1.2] at
/// one position in a certification path.
///
/// Fields are public for reading only. Instances are not modified once created. Each `with_`
/// function returns a new instance that differs from the original only in the named field, so a
/// state produced by a step that fails is never observed.
///
/// [RFC 5280 Section 6.1.2]: <https://datatracker.ietf.org/doc/html/rfc5280#section-6.1.2>
#[readonly::make]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatorState {
    /// Number of certificates in the certification path (n)
    pub path_length: usize,
    /// Position of the certificate being processed, from 1 to n (i)
    pub index: usize,
    /// valid_policy_tree, or None once the tree has become NULL
    pub valid_policy_tree: Option<PolicyTree>,
    /// permitted_subtrees
    pub permitted_subtrees: NameConstraintsSet,
    /// excluded_subtrees
    pub excluded_subtrees: NameConstraintsSet,
    /// explicit_policy
    pub explicit_policy: u32,
    /// inhibit_anyPolicy
    pub inhibit_any_policy: u32,
    /// policy_mapping
    pub policy_mapping: u32,
    /// working_public_key_algorithm
    pub working_public_key_algorithm: ObjectIdentifier,
    /// working_public_key
    pub working_public_key: BitString,
    /// working_public_key_parameters
    pub working_public_key_parameters: Option<Any>,
    /// working_issuer_name
    pub working_issuer_name: Name,
    /// max_path_length
    pub max_path_length: u32,
}

impl ValidatorState {
    /// `initialize` prepares the state for validation of a certification path of length n per
    /// RFC 5280 Section 6.1.2.
    ///
    /// The explicit_policy, inhibit_anyPolicy and policy_mapping counters are set to n+1 unless
    /// the corresponding configuration flag forces zero. The working public key and working issuer
    /// name are taken from the trust anchor.
    pub fn initialize(config: &ValidationConfig, trust_anchor: &PathCertificate, n: usize) -> Self {
        let initial = u32::try_from(n).unwrap_or(u32::MAX).saturating_add(1);
        let counter = |forced_zero: bool| if forced_zero { 0 } else { initial };
        let spki = trust_anchor.subject_public_key_info();

        ValidatorState {
            path_length: n,
            index: 1,
            valid_policy_tree: Some(PolicyTree::new()),
            permitted_subtrees: NameConstraintsSet::default(),
            excluded_subtrees: NameConstraintsSet::default(),
            explicit_policy: counter(config.explicit_policy_required()),
            inhibit_any_policy: counter(config.any_policy_inhibited()),
            policy_mapping: counter(config.policy_mapping_inhibited()),
            working_public_key_algorithm: spki.algorithm.oid,
            working_public_key: spki.subject_public_key.clone(),
            working_public_key_parameters: spki.algorithm.parameters.clone(),
            working_issuer_name: trust_anchor.subject().clone(),
            max_path_length: config.max_path_length(),
        }
    }

    /// `is_final` returns true when the certificate being processed is the last in the path
    pub fn is_final(&self) -> bool {
        self.index == self.path_length
    }

    /// `working_spki` assembles the working public key, algorithm and parameters into a
    /// SubjectPublicKeyInfo suitable for signature verification.
    pub fn working_spki(&self) -> SubjectPublicKeyInfoOwned {
        SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: self.working_public_key_algorithm,
                parameters: self.working_public_key_parameters.clone(),
            },
            subject_public_key: self.working_public_key.clone(),
        }
    }

    with_field!(index, usize);
    with_field!(permitted_subtrees, NameConstraintsSet);
    with_field!(excluded_subtrees, NameConstraintsSet);
    with_field!(explicit_policy, u32);
    with_field!(inhibit_any_policy, u32);
    with_field!(policy_mapping, u32);
    with_field!(working_public_key_algorithm, ObjectIdentifier);
    with_field!(working_public_key, BitString);
    with_field!(working_public_key_parameters, Option<Any>);
    with_field!(working_issuer_name, Name);
    with_field!(max_path_length, u32);

    /// `with_valid_policy_tree` returns a copy of this instance with the given valid_policy_tree.
    /// A NULL tree is never revived, i.e., when the tree is already None the copy retains None.
    #[must_use]
    pub fn with_valid_policy_tree(&self, tree: Option<PolicyTree>) -> Self {
        Self {
            valid_policy_tree: self.valid_policy_tree.as_ref().and(tree),
            ..self.clone()
        }
    }

    /// `without_valid_policy_tree` returns a copy of this instance with a NULL valid_policy_tree
    #[must_use]
    pub fn without_valid_policy_tree(&self) -> Self {
        Self {
            valid_policy_tree: None,
            ..self.clone()
        }
    }

    /// `with_working_public_key_info` updates the working public key, algorithm and parameters from
    /// the certificate per RFC 5280 Section 6.1.4 (d), (e) and (f).
    ///
    /// Parameters present in the certificate replace the working parameters. Absent parameters are
    /// inherited when the algorithm is unchanged and cleared otherwise.
    #[must_use]
    pub fn with_working_public_key_info(&self, cert: &PathCertificate) -> Self {
        let spki = cert.subject_public_key_info();
        let parameters = match &spki.algorithm.parameters {
            Some(params) => Some(params.clone()),
            None if spki.algorithm.oid == self.working_public_key_algorithm => {
                self.working_public_key_parameters.clone()
            }
            None => None,
        };
        self.with_working_public_key(spki.subject_public_key.clone())
            .with_working_public_key_algorithm(spki.algorithm.oid)
            .with_working_public_key_parameters(parameters)
    }
}
