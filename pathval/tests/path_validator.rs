mod common;

use std::str::FromStr;
use std::sync::Mutex;

use const_oid::db::rfc5912::{ID_CE_BASIC_CONSTRAINTS, ID_CE_KEY_USAGE};
use der::asn1::{Null, ObjectIdentifier};
use der::{Any, Tag};
use x509_cert::ext::pkix::KeyUsages;
use x509_cert::name::Name;
use x509_cert::Version;

use common::*;
use pathval::*;

#[test]
fn valid_three_certificate_path() {
    let pe = mock_environment();
    let certs = three_cert_path();
    let result = PathValidator::new(&pe).validate(&config(), &certs).unwrap();

    let ee = result.certificate().unwrap();
    assert_eq!(&certs[2], ee);
    assert_eq!(&Name::from_str(EE).unwrap(), ee.subject());
    assert_eq!(
        ee.subject_public_key_info(),
        &result.subject_public_key_info()
    );
    assert_eq!(3, result.certificates.len());

    // no certificate asserts policies so the tree is NULL
    assert!(result.valid_policy_tree.is_none());
    assert!(result.policies().is_empty());
}

#[test]
fn validate_via_environment() {
    let pe = mock_environment();
    let certs = three_cert_path();
    let direct = PathValidator::new(&pe).validate(&config(), &certs).unwrap();
    let via_pe = pe.validate_path(&config(), &certs).unwrap();
    assert_eq!(direct, via_pe);

    // no validate_path callbacks
    let mut pe = mock_environment();
    pe.clear_validate_path_callbacks();
    assert_eq!(
        Err(Error::Unrecognized),
        pe.validate_path(&config(), &certs)
    );
}

#[test]
fn single_self_signed_certificate() {
    let pe = mock_environment();
    let root = TestCert::root(ROOT).build();

    // self-issued certificates do not consume path length
    let config = config().with_max_path_length(0);
    let result = PathValidator::new(&pe)
        .validate(&config, &[root.clone()])
        .unwrap();
    assert_eq!(Some(&root), result.certificate());
    assert_eq!(root.subject_public_key_info(), &result.subject_public_key_info());
}

#[test]
fn empty_path() {
    let pe = mock_environment();
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &[]),
        PathValidationStatus::EmptyChain,
        0,
    );
}

#[test]
fn expired_end_entity() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT).build(),
        TestCert::ee(EE, ICA)
            .with_validity(NOT_BEFORE, TOI - 1)
            .build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::CertificateExpired,
        3,
    );

    // a later reference time does not help a certificate that is not yet valid
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT).with_validity(TOI + 1, NOT_AFTER).build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::NotYetValid,
        2,
    );
    let later = config().with_reference_time(TimeOfInterest::from_unix_secs(TOI + 2).unwrap());
    assert!(PathValidator::new(&pe).validate(&later, &certs).is_ok());
}

#[test]
fn intermediate_without_basic_constraints() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .without_extension(ID_CE_BASIC_CONSTRAINTS)
            .build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::MissingBasicConstraints,
        2,
    );
}

#[test]
fn intermediate_not_a_ca() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .with_extension(basic_constraints(false, None))
            .build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::NotACertificateAuthority,
        2,
    );
}

#[test]
fn version_1_intermediate() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::new(ICA, ROOT).with_version(Version::V1).build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert!(PathValidator::new(&pe).validate(&config(), &certs).is_ok());
}

#[test]
fn intermediate_without_key_cert_sign() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .with_extension(key_usage(KeyUsages::DigitalSignature.into()))
            .build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::KeyUsageViolation,
        2,
    );

    // keyUsage is optional
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .without_extension(ID_CE_KEY_USAGE)
            .build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert!(PathValidator::new(&pe).validate(&config(), &certs).is_ok());
}

#[test]
fn max_path_length_zero_with_intermediate() {
    let pe = mock_environment();
    let config = config().with_max_path_length(0);
    assert_failure(
        PathValidator::new(&pe).validate(&config, &three_cert_path()),
        PathValidationStatus::PathTooLong,
        2,
    );
}

fn path_with_intermediates(count: usize) -> Vec<PathCertificate> {
    let names: Vec<String> = (1..=count)
        .map(|i| format!("CN=Test ICA {},O=Test,C=US", i))
        .collect();
    let mut certs = vec![TestCert::root(ROOT).build()];
    let mut issuer = ROOT.to_string();
    for name in &names {
        certs.push(TestCert::ca(name, &issuer).build());
        issuer = name.clone();
    }
    certs.push(TestCert::ee(EE, &issuer).build());
    certs
}

#[test]
fn path_length_boundary() {
    let pe = mock_environment();
    let config = config().with_max_path_length(2);
    let validator = PathValidator::new(&pe);

    assert!(validator.validate(&config, &path_with_intermediates(2)).is_ok());
    // root is 1, intermediates are 2 through 4
    assert_failure(
        validator.validate(&config, &path_with_intermediates(3)),
        PathValidationStatus::PathTooLong,
        4,
    );
}

#[test]
fn path_len_constraint() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .with_extension(basic_constraints(true, Some(0)))
            .build(),
        TestCert::ca(ICA2, ICA).build(),
        TestCert::ee(EE, ICA2).build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::PathTooLong,
        3,
    );

    // a self-issued certificate does not count against pathLenConstraint
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .with_extension(basic_constraints(true, Some(0)))
            .build(),
        TestCert::ca(ICA, ICA).with_serial(2).build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert!(PathValidator::new(&pe).validate(&config(), &certs).is_ok());
}

#[test]
fn issuer_mismatch() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT).build(),
        TestCert::ee(EE, "CN=Someone Else,O=Test,C=US")
            .signed_with_key_of(ICA)
            .build(),
    ];
    match PathValidator::new(&pe).validate(&config(), &certs) {
        Err(Error::PathValidation(failure)) => {
            assert_eq!(PathValidationStatus::IssuerMismatch, failure.status);
            assert_eq!(3, failure.index);
            assert_eq!(certs[2].subject_string(), failure.subject);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn bad_signature() {
    let pe = mock_environment();
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT).build(),
        TestCert::ee(EE, ICA).signed_with_key_of(ROOT).build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::SignatureInvalid,
        3,
    );

    // no verifier for the signature algorithm
    let pe = PkiEnvironment::default();
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &three_cert_path()),
        PathValidationStatus::SignatureInvalid,
        1,
    );
}

#[test]
fn trust_anchor_override() {
    let pe = mock_environment();
    let root = TestCert::root(ROOT).build();
    let certs = vec![TestCert::ca(ICA, ROOT).build(), TestCert::ee(EE, ICA).build()];

    let config = config().with_trust_anchor(root);
    let result = PathValidator::new(&pe).validate(&config, &certs).unwrap();
    assert_eq!(Some(&certs[1]), result.certificate());

    // without the override the intermediate is its own trust anchor and its signature fails
    assert_failure(
        PathValidator::new(&pe).validate(&config.without_trust_anchor(), &certs),
        PathValidationStatus::SignatureInvalid,
        1,
    );
}

#[test]
fn intermediate_trust_anchor_override() {
    let pe = mock_environment();
    let config = config().with_trust_anchor(TestCert::ca(ICA, ROOT).build());

    // name chaining starts from the subject of the trust anchor, not its issuer
    let certs = vec![TestCert::ee(EE, ICA).build()];
    let result = PathValidator::new(&pe).validate(&config, &certs).unwrap();
    assert_eq!(Some(&certs[0]), result.certificate());

    let certs = vec![TestCert::ee(EE, ROOT).signed_with_key_of(ICA).build()];
    assert_failure(
        PathValidator::new(&pe).validate(&config, &certs),
        PathValidationStatus::IssuerMismatch,
        1,
    );
}

#[test]
fn unprocessed_critical_extension() {
    let pe = mock_environment();
    let unknown = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.55555.2.1");
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .with_extension(ext(unknown, true, &Null))
            .build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::UnprocessedCriticalExtension,
        2,
    );

    // target certificates are checked during wrap up
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT).build(),
        TestCert::ee(EE, ICA)
            .with_extension(ext(unknown, true, &Null))
            .build(),
    ];
    assert_failure(
        PathValidator::new(&pe).validate(&config(), &certs),
        PathValidationStatus::UnprocessedCriticalExtension,
        3,
    );

    // non-critical extensions are ignored
    let certs = vec![
        TestCert::root(ROOT).build(),
        TestCert::ca(ICA, ROOT)
            .with_extension(ext(unknown, false, &Null))
            .build(),
        TestCert::ee(EE, ICA).build(),
    ];
    assert!(PathValidator::new(&pe).validate(&config(), &certs).is_ok());
}

#[test]
fn validation_is_repeatable() {
    let pe = mock_environment();
    let certs = three_cert_path();
    let config = config().with_initial_policy_set(ObjectIdentifierSet::from([P1]));
    let validator = PathValidator::new(&pe);

    let first = validator.validate(&config, &certs);
    let second = validator.validate(&config, &certs);
    assert_eq!(first, second);

    let good = validator.validate(&self::config(), &certs).unwrap();
    assert_eq!(good, validator.validate(&self::config(), &certs).unwrap());
}

#[test]
fn working_public_key_parameters() {
    let pe = mock_environment();
    let params = Any::new(Tag::Null, Vec::<u8>::new()).unwrap();

    // parameters are inherited when the algorithm is unchanged
    let certs = vec![
        TestCert::root(ROOT)
            .with_key_algorithm(MOCK_KEY, Some(params.clone()))
            .build(),
        TestCert::ca(ICA, ROOT).build(),
        TestCert::ee(EE, ICA).build(),
    ];
    let result = PathValidator::new(&pe).validate(&config(), &certs).unwrap();
    assert_eq!(MOCK_KEY, result.working_public_key_algorithm);
    assert_eq!(Some(params.clone()), result.working_public_key_parameters);

    // and cleared when it changes
    let certs = vec![
        TestCert::root(ROOT)
            .with_key_algorithm(MOCK_KEY, Some(params))
            .build(),
        TestCert::ca(ICA, ROOT).build(),
        TestCert::ee(EE, ICA).with_key_algorithm(MOCK_KEY2, None).build(),
    ];
    let result = PathValidator::new(&pe).validate(&config(), &certs).unwrap();
    assert_eq!(MOCK_KEY2, result.working_public_key_algorithm);
    assert_eq!(None, result.working_public_key_parameters);
    assert_eq!(certs[2].subject_public_key_info(), &result.subject_public_key_info());
}

//-----------------------------------------------------------------------------
// revocation status callbacks
//-----------------------------------------------------------------------------
static OBSERVED_COUNTERS: Mutex<Vec<(usize, u32, u32, u32, u32)>> = Mutex::new(Vec::new());

fn record_counters(
    _pe: &PkiEnvironment,
    _config: &ValidationConfig,
    state: &ValidatorState,
    _cert: &PathCertificate,
) -> pathval::Result<()> {
    OBSERVED_COUNTERS.lock().unwrap().push((
        state.index,
        state.explicit_policy,
        state.policy_mapping,
        state.inhibit_any_policy,
        state.max_path_length,
    ));
    Ok(())
}

fn undetermined(
    _pe: &PkiEnvironment,
    _config: &ValidationConfig,
    _state: &ValidatorState,
    _cert: &PathCertificate,
) -> pathval::Result<()> {
    Err(Error::Unrecognized)
}

fn ee_is_revoked(
    _pe: &PkiEnvironment,
    _config: &ValidationConfig,
    state: &ValidatorState,
    cert: &PathCertificate,
) -> pathval::Result<()> {
    if cert.subject() == &Name::from_str(EE).unwrap() {
        Err(Error::path_validation(
            PathValidationStatus::CertificateRevoked,
            state.index,
            cert.subject_string(),
        ))
    } else {
        Ok(())
    }
}

#[test]
fn counters_never_increase() {
    let mut pe = mock_environment();
    pe.add_check_revocation_status_callback(record_counters);
    let config = config().with_check_revocation_status(true);
    let certs = vec![
        TestCert::root(ROOT).with_extension(any_policy()).build(),
        TestCert::ca(ICA, ROOT)
            .with_extension(any_policy())
            .with_extension(policy_constraints(Some(3), Some(1)))
            .with_extension(inhibit_any_policy(1))
            .build(),
        TestCert::ca(ICA2, ICA).with_extension(any_policy()).build(),
        TestCert::ee(EE, ICA2).with_extension(any_policy()).build(),
    ];
    PathValidator::new(&pe).validate(&config, &certs).unwrap();

    let observed = OBSERVED_COUNTERS.lock().unwrap().clone();
    assert_eq!(4, observed.len());
    assert_eq!((1, 5, 5, 5, 5), observed[0]);
    for pair in observed.windows(2) {
        let (i0, e0, p0, a0, m0) = pair[0];
        let (i1, e1, p1, a1, m1) = pair[1];
        assert_eq!(i0 + 1, i1);
        assert!(e1 <= e0 && p1 <= p0 && a1 <= a0 && m1 <= m0);
    }
    assert_eq!((4, 2, 0, 0, 3), observed[3]);
}

#[test]
fn revocation_status() {
    let certs = three_cert_path();
    let config = config().with_check_revocation_status(true);

    // requested without any means of determining status
    let pe = mock_environment();
    assert_failure(
        PathValidator::new(&pe).validate(&config, &certs),
        PathValidationStatus::RevocationStatusNotDetermined,
        1,
    );

    let mut pe = mock_environment();
    pe.add_check_revocation_status_callback(undetermined);
    assert_failure(
        PathValidator::new(&pe).validate(&config, &certs),
        PathValidationStatus::RevocationStatusNotDetermined,
        1,
    );

    // a revoked certificate stops the search for a determination
    pe.add_check_revocation_status_callback(ee_is_revoked);
    assert_failure(
        PathValidator::new(&pe).validate(&config, &certs),
        PathValidationStatus::CertificateRevoked,
        3,
    );

    // not checked unless requested
    assert!(PathValidator::new(&pe).validate(&self::config(), &certs).is_ok());
}
