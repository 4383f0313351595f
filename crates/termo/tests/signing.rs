#![forbid(unsafe_code)]

use pretty_assertions::assert_eq;
use termo::{
    sign, sign_with_bundle, C14nMode, CertificateBundle, Error, InvalidReason, SignOptions, SigningRequest, Stage,
    VerifyOptions, VerifyResult,
};
use termo_testkit as testkit;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<termo xmlns="urn:example:termo" versao="1.0">
  <adesao id="A-1001"><cliente cpf="00000000191">Maria</cliente></adesao>
  <!-- generated by the agreement service -->
</termo>"#;

fn verify(xml: &str) -> VerifyResult {
    termo::verify(xml, &VerifyOptions::new()).unwrap()
}

fn expect_failure(result: Result<termo::SignedDocument, termo::Failure>) -> termo::Failure {
    match result {
        Ok(signed) => panic!("expected failure, got {}", signed.xml()),
        Err(failure) => failure,
    }
}

#[test]
fn test_sign_and_verify() {
    testkit::init_tracing();
    let pfx = testkit::signing_pkcs12();
    let signed = sign(&SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE)).unwrap();

    assert!(!signed.xml().starts_with("<?xml"));
    assert!(signed.xml().contains(r#"<Reference URI="">"#));
    assert!(signed.xml().trim_end().ends_with("</Signature></termo>"));
    assert!(signed.xml().contains("<!-- generated by the agreement service -->"));
    assert_eq!(verify(signed.xml()), VerifyResult::Valid);
}

#[test]
fn test_sign_is_deterministic() {
    let pfx = testkit::signing_pkcs12();
    let request = SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE);
    let first = sign(&request).unwrap();
    let second = sign(&request).unwrap();
    assert_eq!(first.xml(), second.xml());
    assert_eq!(first.to_base64(), second.to_base64());
}

#[test]
fn test_signed_content_tampering_detected() {
    let pfx = testkit::signing_pkcs12();
    let signed = sign(&SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE)).unwrap();

    let tampered = signed.xml().replace(">Maria<", ">Mario<");
    assert_ne!(tampered, signed.xml());
    assert!(!verify(&tampered).is_valid());
}

#[test]
fn test_named_target_with_id() {
    let pfx = testkit::signing_pkcs12();
    let options = SignOptions::default().with_target_tag("child").with_id_attribute("id");
    let request = SigningRequest::new(r#"<root><child id="x1">data</child></root>"#, &pfx, testkit::PASSPHRASE)
        .with_options(options);
    let signed = sign(&request).unwrap();

    assert!(signed.xml().starts_with(r#"<root><child id="x1">data</child><Signature "#));
    assert!(signed.xml().contains(r##"<Reference URI="#x1">"##));
    assert!(signed.xml().ends_with("</Signature></root>"));
    assert_eq!(verify(signed.xml()), VerifyResult::Valid);
}

#[test]
fn test_empty_root_whole_document() {
    let pfx = testkit::signing_pkcs12();
    let signed = sign(&SigningRequest::new("<root/>", &pfx, testkit::PASSPHRASE)).unwrap();

    assert!(signed.xml().starts_with("<root><Signature "));
    assert!(signed.xml().contains(r#"<Reference URI="">"#));
    assert_eq!(verify(signed.xml()), VerifyResult::Valid);
}

#[test]
fn test_exclusive_c14n_option() {
    let pfx = testkit::signing_pkcs12();
    let request = SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE)
        .with_options(SignOptions::default().with_c14n(C14nMode::Exclusive));
    let signed = sign(&request).unwrap();

    assert!(signed.xml().contains(r#"Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#""#));
    assert_eq!(verify(signed.xml()), VerifyResult::Valid);
}

#[test]
fn test_options_from_json() {
    let options: SignOptions =
        serde_json::from_str(r#"{"target-tag": "adesao", "id-attribute": "id", "strip-declaration": false}"#).unwrap();
    assert_eq!(options.c14n, C14nMode::Inclusive);

    let pfx = testkit::signing_pkcs12();
    let signed = sign(&SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE).with_options(options)).unwrap();
    assert!(signed.xml().starts_with("<?xml"));
    assert!(signed.xml().contains(r##"<Reference URI="#A-1001">"##));
    assert_eq!(verify(signed.xml()), VerifyResult::Valid);
}

#[test]
fn test_expired_certificate_rejected() {
    let key = testkit::rsa_key();
    let pfx = testkit::pkcs12(Some(key), &[testkit::expired_certificate(key)], testkit::PASSPHRASE);
    let failure = expect_failure(sign(&SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE)));

    assert_eq!(failure.stage, Stage::CertificateValidated);
    assert!(matches!(failure.error, Error::CertificateInvalid(InvalidReason::Expired)));
}

#[test]
fn test_not_yet_valid_certificate_rejected() {
    let key = testkit::rsa_key();
    let pfx = testkit::pkcs12(Some(key), &[testkit::future_certificate(key)], testkit::PASSPHRASE);
    let failure = expect_failure(sign(&SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE)));

    assert_eq!(failure.stage, Stage::CertificateValidated);
    assert!(matches!(failure.error, Error::CertificateInvalid(InvalidReason::NotYetValid)));
}

#[test]
fn test_missing_private_key_rejected() {
    let pfx = testkit::pkcs12(None, &[testkit::valid_certificate(testkit::rsa_key())], testkit::PASSPHRASE);
    let failure = expect_failure(sign(&SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE)));

    assert_eq!(failure.stage, Stage::CertificateValidated);
    assert!(matches!(failure.error, Error::CertificateInvalid(InvalidReason::NoPrivateKey)));
}

#[test]
fn test_wrong_passphrase() {
    let pfx = testkit::signing_pkcs12();
    let failure = expect_failure(sign(&SigningRequest::new(DOCUMENT, &pfx, "not the passphrase")));

    assert_eq!(failure.stage, Stage::CertificateLoaded);
    assert!(matches!(failure.error, Error::CertificateLoad(_)));
}

#[test]
fn test_missing_target_tag() {
    let pfx = testkit::signing_pkcs12();
    let request = SigningRequest::new(DOCUMENT, &pfx, testkit::PASSPHRASE)
        .with_options(SignOptions::default().with_target_tag("absent"));
    let failure = expect_failure(sign(&request));

    assert_eq!(failure.stage, Stage::DigestComputed);
    assert!(matches!(failure.error, Error::TargetNotFound(_)));
}

#[test]
fn test_malformed_document() {
    let pfx = testkit::signing_pkcs12();
    let failure = expect_failure(sign(&SigningRequest::new("<root><open></root>", &pfx, testkit::PASSPHRASE)));

    assert_eq!(failure.stage, Stage::DigestComputed);
    assert!(matches!(failure.error, Error::XmlParse(_)));
}

#[test]
fn test_sign_with_loaded_bundle() {
    let key = testkit::rsa_key().clone();
    let certificate = testkit::valid_certificate(&key);
    let bundle = CertificateBundle::new(Some(key), certificate, Vec::new()).unwrap();

    let signed = sign_with_bundle("<root><a>1</a></root>", &bundle, &SignOptions::default()).unwrap();
    assert!(signed.xml().contains(&bundle.certificate_base64()));
    assert_eq!(verify(signed.xml()), VerifyResult::Valid);

    let other = VerifyOptions::new().with_public_key(testkit::other_rsa_key().to_public_key());
    assert!(!termo::verify(signed.xml(), &other).unwrap().is_valid());
}

#[test]
fn test_failure_display() {
    let pfx = testkit::signing_pkcs12();
    let failure = expect_failure(sign(&SigningRequest::new(DOCUMENT, &pfx, "wrong")));
    assert!(failure.to_string().starts_with("signing failed before reaching certificate-loaded"));
    assert!(std::error::Error::source(&failure).is_some());
}
