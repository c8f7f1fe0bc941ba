//! Provides an implementation of the [`VerifySignatureMessage`](crate::VerifySignatureMessage)
//! interface using libraries from the [Rust Crypto](https://github.com/RustCrypto) project.

use alloc::string::String;

use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, SECP_256_R_1, SECP_384_R_1,
    SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION, SHA_512_WITH_RSA_ENCRYPTION,
};
use const_oid::AssociatedOid;
use der::asn1::ObjectIdentifier;
use log::debug;
use p256::ecdsa::signature::Verifier;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::environment::pki_environment::PkiEnvironment;
use crate::util::error::{Error, PathValidationStatus, Result};

fn signature_failure() -> Error {
    Error::path_validation(PathValidationStatus::SignatureInvalid, 0, String::new())
}

/// `get_named_curve` returns the named curve OID from the parameters of an id-ecPublicKey
/// SubjectPublicKeyInfo.
pub(crate) fn get_named_curve(spki: &SubjectPublicKeyInfoOwned) -> Option<ObjectIdentifier> {
    spki.algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.decode_as::<ObjectIdentifier>().ok())
}

fn verify_rsa<D>(message: &[u8], signature: &[u8], spki: &SubjectPublicKeyInfoOwned) -> Result<()>
where
    D: Digest + AssociatedOid,
{
    let key = RsaPublicKey::from_pkcs1_der(spki.subject_public_key.raw_bytes())
        .map_err(|_| Error::Unrecognized)?;
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(key);
    let signature =
        rsa::pkcs1v15::Signature::try_from(signature).map_err(|_| signature_failure())?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| signature_failure())
}

fn verify_p256(message: &[u8], signature: &[u8], spki: &SubjectPublicKeyInfoOwned) -> Result<()> {
    let verifying_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(spki.subject_public_key.raw_bytes())
        .map_err(|_| Error::Unrecognized)?;
    let signature = p256::ecdsa::Signature::from_der(signature).map_err(|_| signature_failure())?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| signature_failure())
}

fn verify_p384(message: &[u8], signature: &[u8], spki: &SubjectPublicKeyInfoOwned) -> Result<()> {
    let verifying_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(spki.subject_public_key.raw_bytes())
        .map_err(|_| Error::Unrecognized)?;
    let signature = p384::ecdsa::Signature::from_der(signature).map_err(|_| signature_failure())?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| signature_failure())
}

/// verify_signature_message_rust_crypto implements the [`VerifySignatureMessage`](crate::VerifySignatureMessage)
/// interface for [`PkiEnvironment`] using implementations from the [Rust Crypto](https://github.com/RustCrypto) project.
///
/// It supports sha256WithRSAEncryption, sha384WithRSAEncryption, sha512WithRSAEncryption,
/// ecdsa-with-SHA256 (P-256 keys) and ecdsa-with-SHA384 (P-384 keys). Other algorithms yield
/// [`Error::Unrecognized`] so that other callbacks may be tried.
pub fn verify_signature_message_rust_crypto(
    _pe: &PkiEnvironment,
    message_to_verify: &[u8],                 // buffer to verify
    signature: &[u8],                         // signature
    signature_alg: &AlgorithmIdentifierOwned, // signature algorithm
    spki: &SubjectPublicKeyInfoOwned,         // public key
) -> Result<()> {
    match signature_alg.oid {
        SHA_256_WITH_RSA_ENCRYPTION => verify_rsa::<Sha256>(message_to_verify, signature, spki),
        SHA_384_WITH_RSA_ENCRYPTION => verify_rsa::<Sha384>(message_to_verify, signature, spki),
        SHA_512_WITH_RSA_ENCRYPTION => verify_rsa::<Sha512>(message_to_verify, signature, spki),
        ECDSA_WITH_SHA_256 | ECDSA_WITH_SHA_384 => {
            match (signature_alg.oid, get_named_curve(spki)) {
                (ECDSA_WITH_SHA_256, Some(SECP_256_R_1)) => {
                    verify_p256(message_to_verify, signature, spki)
                }
                (ECDSA_WITH_SHA_384, Some(SECP_384_R_1)) => {
                    verify_p384(message_to_verify, signature, spki)
                }
                (alg, curve) => {
                    debug!(
                        "Unsupported combination of signature algorithm {} and curve {:?}",
                        alg, curve
                    );
                    Err(Error::Unrecognized)
                }
            }
        }
        _ => {
            debug!("Unsupported signature algorithm: {}", signature_alg.oid);
            Err(Error::Unrecognized)
        }
    }
}
