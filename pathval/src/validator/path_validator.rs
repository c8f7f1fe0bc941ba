//! Functions related to certification path validation operations

use alloc::format;

use const_oid::db::rfc5280::ANY_POLICY;
use der::Decode;
use log::{debug, info};
use x509_cert::ext::pkix::KeyUsages;

use crate::{
    environment::pki_environment::*, util::error::*, util::pdv_utilities::*,
    validator::path_certificate::*, PathCertificate, ValidationConfig, ValidationResult,
    ValidatorState,
};

/// [`PathValidator`] performs certification path validation per [RFC 5280 Section 6.1] using the
/// callbacks of the [`PkiEnvironment`] it was created with, i.e., for signature verification and
/// revocation status determination.
///
/// The certification path is provided as a slice of [`PathCertificate`] ordered from the
/// certificate closest to the trust anchor (index 0) to the target certificate (index n-1). The
/// trust anchor is the one set in the [`ValidationConfig`], if any, otherwise the first certificate
/// in the path. When the first certificate serves as trust anchor, it is processed like any other
/// certificate in the path, i.e., its signature is verified using its own public key.
///
/// Validation either succeeds completely, yielding a [`ValidationResult`], or fails with the first
/// violation encountered, in the order defined by RFC 5280. Failures are reported as
/// [`Error::PathValidation`] carrying the [`PathValidationStatus`], the 1-based position of the
/// offending certificate and its subject name.
///
/// [RFC 5280 Section 6.1]: <https://datatracker.ietf.org/doc/html/rfc5280#section-6.1>
#[derive(Clone, Copy)]
pub struct PathValidator<'a> {
    pe: &'a PkiEnvironment,
}

impl<'a> PathValidator<'a> {
    /// `new` returns a [`PathValidator`] that uses the callbacks in pe
    pub fn new(pe: &'a PkiEnvironment) -> Self {
        PathValidator { pe }
    }

    /// `validate` performs certification path validation for certs using config.
    pub fn validate(
        &self,
        config: &ValidationConfig,
        certs: &[PathCertificate],
    ) -> Result<ValidationResult> {
        let (first, last) = match (certs.first(), certs.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                log::error!("Certification path validation requires at least one certificate");
                return Err(Error::path_validation(
                    PathValidationStatus::EmptyChain,
                    0,
                    alloc::string::String::new(),
                ));
            }
        };

        let trust_anchor = config.trust_anchor().unwrap_or(first);
        debug!(
            "Validating certification path of length {} from {} to {}",
            certs.len(),
            trust_anchor.subject_string(),
            last.subject_string()
        );
        if !config.check_revocation_status() {
            debug!("Revocation status checking is disabled by the validation configuration");
        }

        let mut state = ValidatorState::initialize(config, trust_anchor, certs.len());
        for (i, cert) in certs.iter().enumerate() {
            state = state.with_index(i + 1);
            state = self.process_certificate(config, &state, cert)?;
            if !state.is_final() {
                state = prepare_for_next_certificate(&state, cert)?;
            }
        }
        let state = wrap_up(config, &state, last)?;

        info!(
            "Successfully validated certification path of length {} for {}",
            certs.len(),
            last.subject_string()
        );
        Ok(ValidationResult::new(certs.to_vec(), &state))
    }

    /// `process_certificate` implements RFC 5280 Section 6.1.3, basic certificate processing
    fn process_certificate(
        &self,
        config: &ValidationConfig,
        state: &ValidatorState,
        cert: &PathCertificate,
    ) -> Result<ValidatorState> {
        debug!(
            "Processing certificate {} of {}: {}",
            state.index,
            state.path_length,
            cert.subject_string()
        );

        // (a)(1) signature
        self.verify_signature(state, cert)?;

        // (a)(2) validity
        if let Err(status) = valid_at_time(
            &cert.decoded_cert().tbs_certificate,
            &config.reference_time(),
            true,
        ) {
            return Err(fail(
                state,
                cert,
                status,
                &format!(
                    "certificate is not valid at {} (not before {}, not after {})",
                    config.reference_time(),
                    cert.validity().not_before,
                    cert.validity().not_after
                ),
            ));
        }

        // (a)(3) revocation status
        if config.check_revocation_status() {
            if let Err(e) = self.pe.check_revocation_status(config, state, cert) {
                log_error_for_subject(
                    cert.decoded_cert(),
                    &format!("revocation status check failed: {}", e),
                );
                return Err(e);
            }
        }

        // (a)(4) issuer name
        if !compare_names(cert.issuer(), &state.working_issuer_name) {
            return Err(fail(
                state,
                cert,
                PathValidationStatus::IssuerMismatch,
                &format!(
                    "issuer name {} does not match working issuer name {}",
                    name_to_string(cert.issuer()),
                    name_to_string(&state.working_issuer_name)
                ),
            ));
        }

        // (b) and (c) name constraints
        if !(cert.is_self_issued() && !state.is_final()) {
            check_name_constraints(state, cert)?;
        }

        // (d) and (e) certificate policies
        let state = match (&state.valid_policy_tree, cert.certificate_policies()) {
            (Some(tree), Some(_)) => {
                let tree = tree.process_policies(state, cert);
                if tree.is_none() {
                    debug!(
                        "valid_policy_tree is NULL after processing certificate {}",
                        state.index
                    );
                }
                state.with_valid_policy_tree(tree)
            }
            _ => state.without_valid_policy_tree(),
        };

        // (f)
        check_valid_policy(&state, cert)?;
        Ok(state)
    }

    fn verify_signature(&self, state: &ValidatorState, cert: &PathCertificate) -> Result<()> {
        let signed = match DeferDecodeSigned::from_der(cert.encoded_cert()) {
            Ok(signed) => signed,
            Err(e) => {
                return Err(fail(
                    state,
                    cert,
                    PathValidationStatus::SignatureInvalid,
                    &format!("failed to decode certificate for signature verification: {}", e),
                ))
            }
        };

        match self.pe.verify_signature_message(
            &signed.tbs_field,
            signed.signature.raw_bytes(),
            &signed.signature_algorithm,
            &state.working_spki(),
        ) {
            Ok(()) => Ok(()),
            Err(e) => Err(fail(
                state,
                cert,
                PathValidationStatus::SignatureInvalid,
                &format!("signature verification failed: {}", e),
            )),
        }
    }
}

/// `validate_path_rfc5280` performs certification path validation per [RFC 5280 Section 6.1] using
/// a [`PathValidator`]. It is intended for use in the validate_path callbacks of a [`PkiEnvironment`].
///
/// [RFC 5280 Section 6.1]: <https://datatracker.ietf.org/doc/html/rfc5280#section-6.1>
pub fn validate_path_rfc5280(
    pe: &PkiEnvironment,
    config: &ValidationConfig,
    certs: &[PathCertificate],
) -> Result<ValidationResult> {
    PathValidator::new(pe).validate(config, certs)
}

//-----------------------------------------------------------------------------
// Lower level checks
//-----------------------------------------------------------------------------
fn fail(
    state: &ValidatorState,
    cert: &PathCertificate,
    status: PathValidationStatus,
    msg: &str,
) -> Error {
    log_error_for_subject(cert.decoded_cert(), msg);
    Error::path_validation(status, state.index, cert.subject_string())
}

fn check_valid_policy(state: &ValidatorState, cert: &PathCertificate) -> Result<()> {
    if state.explicit_policy == 0 && state.valid_policy_tree.is_none() {
        return Err(fail(
            state,
            cert,
            PathValidationStatus::NoValidPolicy,
            "explicit policy is required and the valid_policy_tree is NULL",
        ));
    }
    Ok(())
}

fn check_name_constraints(state: &ValidatorState, cert: &PathCertificate) -> Result<()> {
    let san = cert.subject_alt_name();
    let permitted = &state.permitted_subtrees;
    let excluded = &state.excluded_subtrees;

    // emailAddress attributes in the subject are checked only in the absence of a SAN
    let legacy_email = san.is_none();
    if !permitted.subject_within_permitted_subtrees(cert.subject())
        || !permitted.san_within_permitted_subtrees(san)
        || (legacy_email && !permitted.subject_email_within_permitted_subtrees(cert.subject()))
    {
        return Err(fail(
            state,
            cert,
            PathValidationStatus::NameConstraintsViolation,
            "name is not within the permitted subtrees",
        ));
    }

    if excluded.subject_within_excluded_subtrees(cert.subject())
        || excluded.san_within_excluded_subtrees(san)
        || (legacy_email && excluded.subject_email_within_excluded_subtrees(cert.subject()))
    {
        return Err(fail(
            state,
            cert,
            PathValidationStatus::NameConstraintsViolation,
            "name is within the excluded subtrees",
        ));
    }
    Ok(())
}

/// every critical extension must be one that is processed here or by the relying application
fn check_critical_extensions(state: &ValidatorState, cert: &PathCertificate) -> Result<()> {
    for ext in cert.critical_extensions() {
        if !EXTS_OF_INTEREST.contains(&ext.extn_id) {
            return Err(fail(
                state,
                cert,
                PathValidationStatus::UnprocessedCriticalExtension,
                &format!("unprocessed critical extension: {}", ext.extn_id),
            ));
        }
    }
    Ok(())
}

/// `prepare_for_next_certificate` implements RFC 5280 Section 6.1.4
fn prepare_for_next_certificate(
    state: &ValidatorState,
    cert: &PathCertificate,
) -> Result<ValidatorState> {
    let mut state = state.clone();

    // (a) and (b) policy mappings
    if let Some(mappings) = cert.policy_mappings() {
        if mappings.0.iter().any(|m| {
            m.issuer_domain_policy == ANY_POLICY || m.subject_domain_policy == ANY_POLICY
        }) {
            return Err(fail(
                &state,
                cert,
                PathValidationStatus::AnyPolicyMappingForbidden,
                "policy mappings extension maps to or from anyPolicy",
            ));
        }
        if let Some(tree) = &state.valid_policy_tree {
            let tree = tree.process_mappings(&state, cert);
            state = state.with_valid_policy_tree(tree);
        }
    }

    // (c) working issuer name
    state = state.with_working_issuer_name(cert.subject().clone());

    // (d), (e) and (f) working public key
    state = state.with_working_public_key_info(cert);

    // (g) name constraints
    if let Some(nc) = cert.name_constraints() {
        if let Some(permitted) = &nc.permitted_subtrees {
            let p = state.permitted_subtrees.calculate_intersection(permitted);
            state = state.with_permitted_subtrees(p);
        }
        if let Some(excluded) = &nc.excluded_subtrees {
            let e = state.excluded_subtrees.calculate_union(excluded);
            state = state.with_excluded_subtrees(e);
        }
    }

    // (h) counters
    if !cert.is_self_issued() {
        state = state
            .with_explicit_policy(state.explicit_policy.saturating_sub(1))
            .with_policy_mapping(state.policy_mapping.saturating_sub(1))
            .with_inhibit_any_policy(state.inhibit_any_policy.saturating_sub(1));
    }

    // (i) policy constraints
    if let Some(pc) = cert.policy_constraints() {
        if let Some(rep) = pc.require_explicit_policy {
            state = state.with_explicit_policy(state.explicit_policy.min(rep));
        }
        if let Some(ipm) = pc.inhibit_policy_mapping {
            state = state.with_policy_mapping(state.policy_mapping.min(ipm));
        }
    }

    // (j) inhibit anyPolicy
    if let Some(iap) = cert.inhibit_any_policy() {
        state = state.with_inhibit_any_policy(state.inhibit_any_policy.min(iap.0));
    }

    // (k) basic constraints
    let bc = cert.basic_constraints();
    if cert.is_version_3() {
        match bc {
            None => {
                return Err(fail(
                    &state,
                    cert,
                    PathValidationStatus::MissingBasicConstraints,
                    "missing basic constraints",
                ))
            }
            Some(bc) if !bc.ca => {
                return Err(fail(
                    &state,
                    cert,
                    PathValidationStatus::NotACertificateAuthority,
                    "basic constraints does not assert cA",
                ))
            }
            _ => {}
        }
    }

    // (l) path length
    if !cert.is_self_issued() {
        if state.max_path_length == 0 {
            return Err(fail(
                &state,
                cert,
                PathValidationStatus::PathTooLong,
                "path length constraint violation",
            ));
        }
        state = state.with_max_path_length(state.max_path_length - 1);
    }

    // (m) pathLenConstraint
    if let Some(pl) = bc.and_then(|bc| bc.path_len_constraint) {
        state = state.with_max_path_length(state.max_path_length.min(u32::from(pl)));
    }

    // (n) key usage
    if let Some(ku) = cert.key_usage() {
        if !ku.0.contains(KeyUsages::KeyCertSign) {
            return Err(fail(
                &state,
                cert,
                PathValidationStatus::KeyUsageViolation,
                "key usage does not assert keyCertSign",
            ));
        }
    }

    // (o) other critical extensions
    check_critical_extensions(&state, cert)?;

    Ok(state)
}

/// `wrap_up` implements RFC 5280 Section 6.1.5 for the target certificate
fn wrap_up(
    config: &ValidationConfig,
    state: &ValidatorState,
    cert: &PathCertificate,
) -> Result<ValidatorState> {
    // (a)
    let mut state = state.with_explicit_policy(state.explicit_policy.saturating_sub(1));

    // (b)
    if let Some(pc) = cert.policy_constraints() {
        if pc.require_explicit_policy == Some(0) {
            state = state.with_explicit_policy(0);
        }
    }

    // (c), (d) and (e)
    state = state.with_working_public_key_info(cert);

    // (f)
    check_critical_extensions(&state, cert)?;

    // (g)
    if let Some(tree) = &state.valid_policy_tree {
        let tree = tree.calculate_intersection(&state, &config.initial_policy_set());
        if tree.is_none() {
            debug!("valid_policy_tree is NULL after intersection with the initial policy set");
        }
        state = state.with_valid_policy_tree(tree);
    }

    check_valid_policy(&state, cert)?;
    Ok(state)
}
