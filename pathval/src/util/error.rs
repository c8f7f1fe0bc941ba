//! Error types

use alloc::string::String;
use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// PathValidationStatus enumerates the reasons a certification path can fail validation. Each check
/// performed by [`PathValidator`](crate::PathValidator) maps to exactly one value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum PathValidationStatus {
    /// EmptyChain occurs when validation is requested for a list containing no certificates.
    EmptyChain,
    /// SignatureInvalid occurs when the working public key does not verify the signature of the
    /// certificate being processed or when no signature verifier could process the signature.
    SignatureInvalid,
    /// NotYetValid occurs when a certificate contains a notBefore date that is after the reference
    /// time used for a validation operation.
    NotYetValid,
    /// CertificateExpired occurs when a certificate contains a notAfter date that is before the
    /// reference time used for a validation operation.
    CertificateExpired,
    /// IssuerMismatch occurs when the issuer name of a certificate does not match the working issuer
    /// name, i.e., the subject name of the immediately superior certificate.
    IssuerMismatch,
    /// NoValidPolicy occurs when the valid_policy_tree is NULL and explicit_policy has reached zero.
    NoValidPolicy,
    /// AnyPolicyMappingForbidden occurs when a policyMappings extension maps to or from anyPolicy.
    AnyPolicyMappingForbidden,
    /// MissingBasicConstraints occurs when an intermediate v3 CA certificate does not contain a
    /// basicConstraints extension.
    MissingBasicConstraints,
    /// NotACertificateAuthority occurs when an intermediate CA certificate contains a
    /// basicConstraints extension with the cA field set to false.
    NotACertificateAuthority,
    /// PathTooLong occurs when a non-self-issued intermediate CA certificate is encountered after
    /// max_path_length has reached zero.
    PathTooLong,
    /// KeyUsageViolation occurs when an intermediate CA certificate has a keyUsage extension that
    /// does not assert keyCertSign.
    KeyUsageViolation,
    /// NameConstraintsViolation occurs when a subject name or subject alternative name falls outside
    /// the permitted subtrees or within the excluded subtrees.
    NameConstraintsViolation,
    /// UnprocessedCriticalExtension occurs when a certificate features a critical extension that
    /// is not processed during certification path validation.
    UnprocessedCriticalExtension,
    /// RevocationStatusNotDetermined occurs when revocation checking was requested and no
    /// determination could be made.
    RevocationStatusNotDetermined,
    /// CertificateRevoked occurs when a revocation status callback reports a certificate as revoked.
    CertificateRevoked,
}

/// PathValidationFailure identifies the check that failed and the certificate that failed it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathValidationFailure {
    /// Reason for the failure
    pub status: PathValidationStatus,
    /// RFC 5280 position (1..n) of the certificate that failed, or 0 if the failure is not tied to a
    /// certificate
    pub index: usize,
    /// Subject name of the certificate that failed, or an empty string
    pub subject: String,
}

/// Error type
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Certification path validation failed
    PathValidation(PathValidationFailure),
    /// Unrecognized is returned when no registered callback could produce an answer
    Unrecognized,
    /// ParseError is returned when a configuration could not be read
    ParseError,
    /// Asn1Error is used to propagate error information from the x509 crate.
    Asn1Error(der::Error),
    /// StdIoError is used to propagate error information from std::io.
    #[cfg(feature = "std")]
    StdIoError(std::io::ErrorKind),
}

impl Error {
    /// `path_validation` creates an [`Error::PathValidation`] value.
    pub fn path_validation(status: PathValidationStatus, index: usize, subject: String) -> Self {
        Error::PathValidation(PathValidationFailure {
            status,
            index,
            subject,
        })
    }

    /// `status` returns the [`PathValidationStatus`] carried by an [`Error::PathValidation`] value.
    pub fn status(&self) -> Option<PathValidationStatus> {
        match self {
            Error::PathValidation(failure) => Some(failure.status),
            _ => None,
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for PathValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValidationStatus::EmptyChain => write!(f, "No certificates were provided"),
            PathValidationStatus::SignatureInvalid => write!(f, "Signature verification failure"),
            PathValidationStatus::NotYetValid => write!(f, "Certificate is not yet valid"),
            PathValidationStatus::CertificateExpired => write!(f, "Certificate has expired"),
            PathValidationStatus::IssuerMismatch => write!(f, "Name chaining failure"),
            PathValidationStatus::NoValidPolicy => write!(f, "No valid certificate policy"),
            PathValidationStatus::AnyPolicyMappingForbidden => {
                write!(f, "Policy mapping involving anyPolicy")
            }
            PathValidationStatus::MissingBasicConstraints => {
                write!(f, "Missing basic constraints")
            }
            PathValidationStatus::NotACertificateAuthority => {
                write!(f, "Intermediate certificate is not a CA")
            }
            PathValidationStatus::PathTooLong => write!(f, "Path length constraint violated"),
            PathValidationStatus::KeyUsageViolation => write!(f, "Invalid key usage"),
            PathValidationStatus::NameConstraintsViolation => {
                write!(f, "Name constraints violation")
            }
            PathValidationStatus::UnprocessedCriticalExtension => {
                write!(f, "Unprocessed critical extension")
            }
            PathValidationStatus::RevocationStatusNotDetermined => {
                write!(f, "Revocation status could not be determined")
            }
            PathValidationStatus::CertificateRevoked => write!(f, "Certificate is revoked"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PathValidation(failure) => {
                if failure.subject.is_empty() {
                    write!(f, "PathValidation: {}", failure.status)
                } else {
                    write!(
                        f,
                        "PathValidation: {} (certificate {}: {})",
                        failure.status, failure.index, failure.subject
                    )
                }
            }
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::ParseError => write!(f, "ParseError"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            #[cfg(feature = "std")]
            Error::StdIoError(err) => write!(f, "StdIoError: {:?}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[test]
fn error_test() {
    use alloc::{format, string::ToString};

    let _s = format!("{}", PathValidationStatus::EmptyChain);
    let _s = format!("{}", PathValidationStatus::SignatureInvalid);
    let _s = format!("{}", PathValidationStatus::NotYetValid);
    let _s = format!("{}", PathValidationStatus::CertificateExpired);
    let _s = format!("{}", PathValidationStatus::IssuerMismatch);
    let _s = format!("{}", PathValidationStatus::NoValidPolicy);
    let _s = format!("{}", PathValidationStatus::AnyPolicyMappingForbidden);
    let _s = format!("{}", PathValidationStatus::MissingBasicConstraints);
    let _s = format!("{}", PathValidationStatus::NotACertificateAuthority);
    let _s = format!("{}", PathValidationStatus::PathTooLong);
    let _s = format!("{}", PathValidationStatus::KeyUsageViolation);
    let _s = format!("{}", PathValidationStatus::NameConstraintsViolation);
    let _s = format!("{}", PathValidationStatus::UnprocessedCriticalExtension);
    let _s = format!("{}", PathValidationStatus::RevocationStatusNotDetermined);
    let _s = format!("{}", PathValidationStatus::CertificateRevoked);
    let _s = format!("{}", Error::Unrecognized);
    let _s = format!("{}", Error::ParseError);

    let e = Error::path_validation(
        PathValidationStatus::PathTooLong,
        2,
        "CN=Intermediate".to_string(),
    );
    assert_eq!(Some(PathValidationStatus::PathTooLong), e.status());
    assert_eq!(
        "PathValidation: Path length constraint violated (certificate 2: CN=Intermediate)",
        format!("{}", e)
    );
    assert_eq!(None, Error::Unrecognized.status());
}
