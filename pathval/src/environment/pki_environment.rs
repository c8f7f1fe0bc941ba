//! PkiEnvironment aggregates a set of function pointers that supply functionality useful when
//! validating a certification path, i.e., signature verification, revocation status determination
//! and path validation itself.
//!
//! The sample below illustrates preparation of a PkiEnvironment object for use in validating
//! certification paths.
//! ```
//! use pathval::*;
//!
//! // the default PkiEnvironment features RustCrypto signature verification and RFC 5280 path validation
//! let pe = PkiEnvironment::default();
//!
//! // an empty PkiEnvironment can be populated with the same capabilities
//! let mut pe = PkiEnvironment::new();
//! populate_5280_pki_environment(&mut pe);
//! ```
//!
//! The aggregation of function pointers allows implementations of features to vary. For example,
//! one app may verify signatures using a hardware module and another may check revocation status
//! using a local cache of CRLs.

use alloc::{vec, vec::Vec};

use log::debug;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::{
    environment::pki_environment_traits::*, util::crypto::*, util::error::*,
    validator::path_validator::validate_path_rfc5280, PathCertificate, ValidationConfig,
    ValidationResult, ValidatorState,
};

/// [`PkiEnvironment`] provides a switchboard of callback functions that allow support to vary on
/// different platforms or to allow support to be tailored for specific use cases.
#[derive(Clone)]
pub struct PkiEnvironment {
    /// List of functions that provide signature verification functionality given a message
    verify_signature_message_callbacks: Vec<VerifySignatureMessage>,

    /// List of functions that determine the revocation status of a certificate
    check_revocation_status_callbacks: Vec<CheckRevocationStatus>,

    /// List of functions that provide certification path validation functionality
    validate_path_callbacks: Vec<ValidatePath>,
}

impl Default for PkiEnvironment {
    /// PkiEnvironment::default returns a new [`PkiEnvironment`] populated via
    /// [`populate_5280_pki_environment`].
    fn default() -> Self {
        PkiEnvironment {
            verify_signature_message_callbacks: vec![verify_signature_message_rust_crypto],
            check_revocation_status_callbacks: vec![],
            validate_path_callbacks: vec![validate_path_rfc5280],
        }
    }
}

impl PkiEnvironment {
    /// PkiEnvironment::new returns a new [`PkiEnvironment`] with empty callback vectors for each type of callback
    pub fn new() -> PkiEnvironment {
        PkiEnvironment {
            verify_signature_message_callbacks: vec![],
            check_revocation_status_callbacks: vec![],
            validate_path_callbacks: vec![],
        }
    }

    /// clear_all_callbacks clears the contents of all function pointer vectors associated with an
    /// instance of [`PkiEnvironment`].
    pub fn clear_all_callbacks(&mut self) {
        self.clear_verify_signature_message_callbacks();
        self.clear_check_revocation_status_callbacks();
        self.clear_validate_path_callbacks();
    }

    /// add_validate_path_callback adds a [`ValidatePath`] callback to the list used by validate_path.
    pub fn add_validate_path_callback(&mut self, c: ValidatePath) {
        self.validate_path_callbacks.push(c);
    }

    /// clear_validate_path_callbacks clears the list of [`ValidatePath`] callbacks used by validate_path.
    pub fn clear_validate_path_callbacks(&mut self) {
        self.validate_path_callbacks.clear();
    }

    /// validate_path iterates over validate_path_callbacks until an authoritative answer is found
    /// or all options have been exhausted
    pub fn validate_path(
        &self,
        config: &ValidationConfig,
        certs: &[PathCertificate],
    ) -> Result<ValidationResult> {
        let mut err = None;
        for f in &self.validate_path_callbacks {
            match f(self, config, certs) {
                Ok(r) => {
                    return Ok(r);
                }
                Err(e) => {
                    err = Some(e);
                }
            }
        }
        if let Some(e) = err {
            return Err(e);
        }
        Err(Error::Unrecognized)
    }

    /// add_verify_signature_message_callback adds a [`VerifySignatureMessage`] callback to the list used by verify_signature_message.
    pub fn add_verify_signature_message_callback(&mut self, c: VerifySignatureMessage) {
        self.verify_signature_message_callbacks.push(c);
    }

    /// clear_verify_signature_message_callbacks clears the list of [`VerifySignatureMessage`] callbacks used by verify_signature_message.
    pub fn clear_verify_signature_message_callbacks(&mut self) {
        self.verify_signature_message_callbacks.clear();
    }

    /// verify_signature_message iterates over verify_signature_message_callbacks until one verifies
    /// the signature or all options have been exhausted, in which case the last error is returned.
    pub fn verify_signature_message(
        &self,
        message_to_verify: &[u8],                 // buffer to verify
        signature: &[u8],                         // signature
        signature_alg: &AlgorithmIdentifierOwned, // signature algorithm
        spki: &SubjectPublicKeyInfoOwned,         // public key
    ) -> Result<()> {
        let mut err = None;
        for f in &self.verify_signature_message_callbacks {
            match f(self, message_to_verify, signature, signature_alg, spki) {
                Ok(()) => return Ok(()),
                Err(e) => err = Some(e),
            }
        }
        Err(err.unwrap_or(Error::Unrecognized))
    }

    /// add_check_revocation_status_callback adds a [`CheckRevocationStatus`] callback to the list used by check_revocation_status.
    pub fn add_check_revocation_status_callback(&mut self, c: CheckRevocationStatus) {
        self.check_revocation_status_callbacks.push(c);
    }

    /// clear_check_revocation_status_callbacks clears the list of [`CheckRevocationStatus`] callbacks used by check_revocation_status.
    pub fn clear_check_revocation_status_callbacks(&mut self) {
        self.check_revocation_status_callbacks.clear();
    }

    /// check_revocation_status iterates over check_revocation_status_callbacks until one reports the
    /// certificate as not revoked or as revoked. If no callback reaches a determination,
    /// [`PathValidationStatus::RevocationStatusNotDetermined`] is returned.
    pub fn check_revocation_status(
        &self,
        config: &ValidationConfig,
        state: &ValidatorState,
        cert: &PathCertificate,
    ) -> Result<()> {
        for f in &self.check_revocation_status_callbacks {
            match f(self, config, state, cert) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if Some(PathValidationStatus::CertificateRevoked) == e.status() {
                        return Err(e);
                    }
                    debug!("Revocation status callback did not reach a determination: {}", e);
                }
            }
        }
        Err(Error::path_validation(
            PathValidationStatus::RevocationStatusNotDetermined,
            state.index,
            cert.subject_string(),
        ))
    }
}

/// `populate_5280_pki_environment` adds RustCrypto signature verification and RFC 5280 path
/// validation to the given [`PkiEnvironment`].
pub fn populate_5280_pki_environment(pe: &mut PkiEnvironment) {
    pe.add_validate_path_callback(validate_path_rfc5280);
    pe.add_verify_signature_message_callback(verify_signature_message_rust_crypto);
}
