//! The pki_environment_traits module features type definitions that are used by [`PkiEnvironment`]
//! to supply functionality that supports validating X.509 certification paths.

use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::util::error::*;
use crate::{PathCertificate, PkiEnvironment, ValidationConfig, ValidationResult, ValidatorState};

/// `ValidatePath` provides a function signature for implementations that perform certification path
/// validation.
pub type ValidatePath = fn(
    &PkiEnvironment,
    &ValidationConfig,  // configuration to govern validation
    &[PathCertificate], // certificates, trust anchor first and end entity last
) -> Result<ValidationResult>;

/// `VerifySignatureMessage` provides a function signature for implementations that perform signature
/// verification over a message.
pub type VerifySignatureMessage = fn(
    &PkiEnvironment,
    &[u8],                      // message to hash and verify
    &[u8],                      // signature
    &AlgorithmIdentifierOwned,  // signature algorithm
    &SubjectPublicKeyInfoOwned, // public key
) -> Result<()>;

/// `CheckRevocationStatus` provides a function signature for implementations that determine the
/// revocation status of a certificate. The [`ValidatorState`] conveys the working issuer name and
/// working public key, i.e., the issuer of the certificate. Implementations return `Ok(())` when the
/// certificate is known to be not revoked, a [`PathValidationStatus::CertificateRevoked`] failure
/// when it is known to be revoked and any other error when no determination was made.
pub type CheckRevocationStatus = fn(
    &PkiEnvironment,
    &ValidationConfig, // configuration governing validation
    &ValidatorState,   // state prior to processing the certificate
    &PathCertificate,  // certificate to check
) -> Result<()>;
