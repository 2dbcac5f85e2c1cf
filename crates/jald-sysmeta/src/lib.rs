//! C3 — the system-metadata envelope builder.
//!
//! The envelope is a deterministic JSON object (key order is simply the
//! insertion order here, and `serde_json::Map` is BTreeMap-backed by
//! default so it serializes in sorted key order regardless) containing the
//! record's kind, source, uuid, timestamp, and — when requested — the
//! payload/app-meta digests. A detached PKCS#1v1.5 RSA-SHA256 signature
//! over the canonical JSON bytes is appended when a signing key is
//! configured, mirroring the original's `openssl`-based
//! `jal_sign_detached`/`PEM_read_RSAPrivateKey` usage.

use std::fs;
use std::path::Path;

use base64::Engine as _;
use chrono::Utc;
use jald_digest::Digest;
use jald_error::{Error, Result};
use jald_record::RecordKind;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// A loaded private key, ready to produce detached signatures.
pub struct SigningKey {
    key: PKey<Private>,
}

impl SigningKey {
    /// Loads a PEM-encoded RSA private key from `path`.
    pub fn load_from_pem(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(Error::FileIo)?;
        let key = PKey::private_key_from_pem(&bytes)
            .map_err(|e| Error::invalid(format!("loading signing key {}: {e}", path.display())))?;
        Ok(SigningKey { key })
    }

    fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut signer = Signer::new(MessageDigest::sha256(), &self.key)
            .map_err(|e| Error::invalid(format!("creating signer: {e}")))?;
        signer
            .update(bytes)
            .map_err(|e| Error::invalid(format!("signing update: {e}")))?;
        signer
            .sign_to_vec()
            .map_err(|e| Error::invalid(format!("finalizing signature: {e}")))
    }
}

/// A loaded signing certificate, carried alongside the signing key (spec
/// §3, "Worker context") and embedded next to the signature so a verifier
/// doesn't need the cert pre-distributed out of band.
pub struct SigningCert {
    pem: Vec<u8>,
}

impl SigningCert {
    /// Loads a PEM-encoded X.509 certificate from `path`. Parsed (not just
    /// read) so a malformed cert file fails fast at startup rather than
    /// being silently embedded as garbage.
    pub fn load_from_pem(path: &Path) -> Result<Self> {
        let pem = fs::read(path).map_err(Error::FileIo)?;
        openssl::x509::X509::from_pem(&pem)
            .map_err(|e| Error::invalid(format!("loading signing cert {}: {e}", path.display())))?;
        Ok(SigningCert { pem })
    }
}

/// Inputs to the envelope builder: the record identity plus whatever
/// digests the caller already computed (per `manifest_sys_meta`).
pub struct SysMetaInput<'a> {
    pub kind: RecordKind,
    pub source: &'a str,
    pub uuid: Uuid,
    pub payload_digest: Option<&'a Digest>,
    pub app_meta_digest: Option<&'a Digest>,
}

fn digest_json(digest: &Digest) -> Value {
    json!({
        "value": digest.to_hex(),
        "algorithm_uri": digest.algorithm_uri,
    })
}

/// Builds the canonical system-metadata bytes for a record, optionally
/// appending a detached signature (and the signing certificate, if one was
/// configured) when `signing_key` is `Some`.
pub fn build(
    input: SysMetaInput<'_>,
    signing_key: Option<&SigningKey>,
    signing_cert: Option<&SigningCert>,
) -> Result<Vec<u8>> {
    let mut envelope = Map::new();
    envelope.insert("kind".to_string(), json!(input.kind.as_str()));
    envelope.insert("source".to_string(), json!(input.source));
    envelope.insert("uuid".to_string(), json!(input.uuid.to_string()));
    envelope.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));

    if let Some(digest) = input.payload_digest {
        envelope.insert("payload_digest".to_string(), digest_json(digest));
    }
    if let Some(digest) = input.app_meta_digest {
        envelope.insert("app_meta_digest".to_string(), digest_json(digest));
    }

    let canonical = serde_json::to_vec(&Value::Object(envelope.clone()))
        .map_err(|e| Error::internal(format!("serializing system metadata: {e}")))?;

    if let Some(key) = signing_key {
        let signature = key.sign(&canonical)?;
        envelope.insert(
            "signature".to_string(),
            json!(base64::engine::general_purpose::STANDARD.encode(signature)),
        );
        if let Some(cert) = signing_cert {
            envelope.insert(
                "signer_cert".to_string(),
                json!(base64::engine::general_purpose::STANDARD.encode(&cert.pem)),
            );
        }
        return serde_json::to_vec(&Value::Object(envelope))
            .map_err(|e| Error::internal(format!("serializing signed system metadata: {e}")));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jald_digest::digest_buffer;

    #[test]
    fn unsigned_envelope_omits_digests_when_absent() {
        let bytes = build(
            SysMetaInput {
                kind: RecordKind::Audit,
                source: "localhost",
                uuid: Uuid::nil(),
                payload_digest: None,
                app_meta_digest: None,
            },
            None,
            None,
        )
        .unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["kind"], "audit");
        assert!(parsed.get("payload_digest").is_none());
        assert!(parsed.get("signature").is_none());
    }

    #[test]
    fn envelope_includes_digests_when_present() {
        let digest = digest_buffer(b"hello world");
        let bytes = build(
            SysMetaInput {
                kind: RecordKind::Journal,
                source: "localhost",
                uuid: Uuid::nil(),
                payload_digest: Some(&digest),
                app_meta_digest: None,
            },
            None,
            None,
        )
        .unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["payload_digest"]["value"], digest.to_hex());
        assert_eq!(
            parsed["payload_digest"]["algorithm_uri"],
            jald_digest::SHA256_ALGORITHM_URI
        );
    }

    #[test]
    fn signed_envelope_verifies_with_matching_public_key() {
        use openssl::rsa::Rsa;

        let rsa = Rsa::generate(2048).unwrap();
        let pem = rsa.private_key_to_pem().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("signing.key");
        std::fs::write(&key_path, &pem).unwrap();

        let signing_key = SigningKey::load_from_pem(&key_path).unwrap();
        let bytes = build(
            SysMetaInput {
                kind: RecordKind::Log,
                source: "localhost",
                uuid: Uuid::nil(),
                payload_digest: None,
                app_meta_digest: None,
            },
            Some(&signing_key),
            None,
        )
        .unwrap();

        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(parsed.get("signature").is_some());
        assert!(parsed.get("signer_cert").is_none());

        // Re-derive the canonical (unsigned) form and verify the signature.
        let mut unsigned = parsed.as_object().unwrap().clone();
        unsigned.remove("signature");
        let canonical = serde_json::to_vec(&Value::Object(unsigned)).unwrap();

        let pkey = PKey::from_rsa(rsa).unwrap();
        let mut verifier =
            openssl::sign::Verifier::new(MessageDigest::sha256(), &pkey).unwrap();
        verifier.update(&canonical).unwrap();
        let sig_bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed["signature"].as_str().unwrap())
            .unwrap();
        assert!(verifier.verify(&sig_bytes).unwrap());
    }

    fn self_signed_cert_pem(rsa: &openssl::rsa::Rsa<openssl::pkey::Private>) -> Vec<u8> {
        use openssl::asn1::Asn1Time;
        use openssl::bn::{BigNum, MsbOption};
        use openssl::x509::{X509Name, X509};

        let pkey = PKey::from_rsa(rsa.clone()).unwrap();
        let mut name_builder = X509Name::builder().unwrap();
        name_builder
            .append_entry_by_text("CN", "jald-test")
            .unwrap();
        let name = name_builder.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let mut serial = BigNum::new().unwrap();
        serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();
        builder
            .set_serial_number(&serial.to_asn1_integer().unwrap())
            .unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();
        builder.build().to_pem().unwrap()
    }

    #[test]
    fn signed_envelope_embeds_signer_cert_when_configured() {
        use openssl::rsa::Rsa;

        let rsa = Rsa::generate(2048).unwrap();
        let key_pem = rsa.private_key_to_pem().unwrap();
        let cert_pem = self_signed_cert_pem(&rsa);

        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("signing.key");
        let cert_path = dir.path().join("signing.crt");
        std::fs::write(&key_path, &key_pem).unwrap();
        std::fs::write(&cert_path, &cert_pem).unwrap();

        let signing_key = SigningKey::load_from_pem(&key_path).unwrap();
        let signing_cert = SigningCert::load_from_pem(&cert_path).unwrap();

        let bytes = build(
            SysMetaInput {
                kind: RecordKind::Audit,
                source: "localhost",
                uuid: Uuid::nil(),
                payload_digest: None,
                app_meta_digest: None,
            },
            Some(&signing_key),
            Some(&signing_cert),
        )
        .unwrap();

        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        let embedded = base64::engine::general_purpose::STANDARD
            .decode(parsed["signer_cert"].as_str().unwrap())
            .unwrap();
        assert_eq!(embedded, cert_pem);
    }

    #[test]
    fn malformed_cert_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("bad.crt");
        std::fs::write(&cert_path, b"not a certificate").unwrap();
        assert!(SigningCert::load_from_pem(&cert_path).is_err());
    }
}
