#![forbid(unsafe_code)]

//! BER parsing of PKCS#12 (PFX) structures (RFC 7292).
//!
//! PFX files in the wild are BER, not strict DER, so everything goes
//! through `yasna::parse_ber`.

use crate::kdf::{self, KdfHash, Prf};
use crate::oid::{self, oid};
use crate::Pkcs12Contents;
use termo_core::Error;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, Tag};
use zeroize::Zeroizing;

#[derive(Debug)]
enum EncryptionAlgorithm {
    PbeSha1And3Des {
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2 {
        salt: Vec<u8>,
        iterations: u32,
        prf: Prf,
        iv: Vec<u8>,
    },
}

struct MacData {
    hash: KdfHash,
    digest: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

enum ContentInfo {
    Data(Vec<u8>),
    EncryptedData {
        algorithm: EncryptionAlgorithm,
        ciphertext: Vec<u8>,
    },
}

enum SafeBag {
    ShroudedKey {
        algorithm: EncryptionAlgorithm,
        ciphertext: Vec<u8>,
    },
    Cert(Vec<u8>),
    Other,
}

fn invalid() -> ASN1Error {
    ASN1Error::new(ASN1ErrorKind::Invalid)
}

fn load_error(what: &str, e: ASN1Error) -> Error {
    Error::CertificateLoad(format!("malformed PKCS#12 {what}: {e}"))
}

pub fn parse_pfx(data: &[u8], password: &str) -> Result<Pkcs12Contents, Error> {
    let (auth_safe, mac) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            if r.next().read_u32()? != 3 {
                return Err(invalid());
            }
            let auth_safe = r.next().read_sequence(|r| {
                if r.next().read_oid()? != oid(oid::DATA) {
                    return Err(invalid());
                }
                r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
            })?;
            let mac = r.read_optional(parse_mac_data)?;
            Ok((auth_safe, mac))
        })
    })
    .map_err(|e| load_error("PFX", e))?;

    let bmp_password = kdf::password_to_bmp(password);

    match mac {
        Some(mac) => verify_mac(&mac, &auth_safe, &bmp_password)?,
        None => tracing::warn!("PKCS#12 container has no MAC; integrity not checked"),
    }

    let content_infos = yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(parse_content_info))
        .map_err(|e| load_error("authenticated safe", e))?;

    let mut contents = Pkcs12Contents {
        private_keys: Vec::new(),
        certificates: Vec::new(),
    };

    for content_info in content_infos {
        let bags_der = match content_info {
            ContentInfo::Data(data) => Zeroizing::new(data),
            ContentInfo::EncryptedData { algorithm, ciphertext } => {
                decrypt(&algorithm, &ciphertext, password, &bmp_password)?
            }
        };

        let bags = yasna::parse_ber(&bags_der, |r| r.collect_sequence_of(parse_safe_bag))
            .map_err(|e| load_error("safe contents", e))?;

        for bag in bags {
            match bag {
                SafeBag::ShroudedKey { algorithm, ciphertext } => {
                    let pkcs8 = decrypt(&algorithm, &ciphertext, password, &bmp_password)?;
                    contents.private_keys.push(pkcs8);
                }
                SafeBag::Cert(der) => contents.certificates.push(der),
                SafeBag::Other => {}
            }
        }
    }

    tracing::debug!(
        keys = contents.private_keys.len(),
        certificates = contents.certificates.len(),
        "parsed PKCS#12 container"
    );
    Ok(contents)
}

fn parse_content_info(r: BERReader) -> Result<ContentInfo, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type == oid(oid::DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            return Ok(ContentInfo::Data(data));
        }
        if content_type != oid(oid::ENCRYPTED_DATA) {
            return Err(invalid());
        }
        // [0] EXPLICIT EncryptedData { version, EncryptedContentInfo }
        r.next().read_tagged(Tag::context(0), |r| {
            r.read_sequence(|r| {
                let _version = r.next().read_u32()?;
                r.next().read_sequence(|r| {
                    let _content_type = r.next().read_oid()?;
                    let algorithm = parse_encryption_algorithm(r.next())?;
                    let ciphertext = r
                        .next()
                        .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                    Ok(ContentInfo::EncryptedData { algorithm, ciphertext })
                })
            })
        })
    })
}

fn parse_safe_bag(r: BERReader) -> Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;

        let bag = if bag_type == oid(oid::PKCS8_SHROUDED_KEY_BAG) {
            // [0] EXPLICIT EncryptedPrivateKeyInfo
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let algorithm = parse_encryption_algorithm(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok(SafeBag::ShroudedKey { algorithm, ciphertext })
                })
            })?
        } else if bag_type == oid(oid::CERT_BAG) {
            // [0] EXPLICIT CertBag { certId, [0] EXPLICIT OCTET STRING }
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    if r.next().read_oid()? != oid(oid::X509_CERTIFICATE) {
                        return Err(invalid());
                    }
                    let der = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
                    Ok(SafeBag::Cert(der))
                })
            })?
        } else {
            r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Other
        };

        skip_bag_attributes(r)?;
        Ok(bag)
    })
}

/// Consume the optional `bagAttributes` SET (friendlyName, localKeyId, ...).
fn skip_bag_attributes(r: &mut yasna::BERReaderSeq) -> Result<(), ASN1Error> {
    r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                r.next().read_oid()?;
                r.next().read_set_of(|r| r.read_der().map(drop))
            })
        })
    })?;
    Ok(())
}

fn parse_encryption_algorithm(r: BERReader) -> Result<EncryptionAlgorithm, ASN1Error> {
    r.read_sequence(|r| {
        let alg = r.next().read_oid()?;

        if alg == oid(oid::PBE_SHA1_3DES) {
            return r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(EncryptionAlgorithm::PbeSha1And3Des { salt, iterations })
            });
        }
        if alg != oid(oid::PBES2) {
            return Err(invalid());
        }

        // PBES2-params { keyDerivationFunc, encryptionScheme }
        r.next().read_sequence(|r| {
            let (salt, iterations, prf) = r.next().read_sequence(|r| {
                if r.next().read_oid()? != oid(oid::PBKDF2) {
                    return Err(invalid());
                }
                r.next().read_sequence(parse_pbkdf2_params)
            })?;
            let iv = r.next().read_sequence(|r| {
                if r.next().read_oid()? != oid(oid::AES_256_CBC) {
                    return Err(invalid());
                }
                r.next().read_bytes()
            })?;
            Ok(EncryptionAlgorithm::Pbes2 { salt, iterations, prf, iv })
        })
    })
}

/// PBKDF2-params { salt, iterationCount, keyLength OPTIONAL, prf DEFAULT hmacWithSHA1 }
fn parse_pbkdf2_params(r: &mut yasna::BERReaderSeq) -> Result<(Vec<u8>, u32, Prf), ASN1Error> {
    let salt = r.next().read_bytes()?;
    let iterations = r.next().read_u32()?;

    let mut prf = Prf::HmacSha1;
    // keyLength is an INTEGER (0x02), prf a SEQUENCE (0x30).
    if let Some(der) = r.read_optional(|r| r.read_der())? {
        let prf_der = if der.first() == Some(&0x30) {
            Some(der)
        } else {
            r.read_optional(|r| r.read_der())?
        };
        if let Some(prf_der) = prf_der {
            prf = parse_prf(&prf_der)?;
        }
    }
    Ok((salt, iterations, prf))
}

fn parse_prf(der: &[u8]) -> Result<Prf, ASN1Error> {
    yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let prf = r.next().read_oid()?;
            r.read_optional(|r| r.read_null())?;
            if prf == oid(oid::HMAC_SHA256) {
                Ok(Prf::HmacSha256)
            } else if prf == oid(oid::HMAC_SHA1) {
                Ok(Prf::HmacSha1)
            } else {
                Err(invalid())
            }
        })
    })
}

fn parse_mac_data(r: BERReader) -> Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        // DigestInfo { AlgorithmIdentifier, digest }
        let (hash, digest) = r.next().read_sequence(|r| {
            let hash = r.next().read_sequence(|r| {
                let hash = r.next().read_oid()?;
                r.read_optional(|r| r.read_null())?;
                if hash == oid(oid::SHA256) {
                    Ok(KdfHash::Sha256)
                } else if hash == oid(oid::SHA1) {
                    Ok(KdfHash::Sha1)
                } else {
                    Err(invalid())
                }
            })?;
            let digest = r.next().read_bytes()?;
            Ok((hash, digest))
        })?;
        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
        Ok(MacData { hash, digest, salt, iterations })
    })
}

fn verify_mac(mac: &MacData, auth_safe: &[u8], bmp_password: &[u8]) -> Result<(), Error> {
    let key = kdf::pkcs12_kdf(
        mac.hash,
        kdf::ID_MAC,
        bmp_password,
        &mac.salt,
        mac.iterations,
        mac.hash.output_len(),
    );
    let computed = kdf::compute_mac(mac.hash, &key, auth_safe)?;
    if computed != mac.digest {
        return Err(Error::CertificateLoad(
            "PKCS#12 MAC verification failed (wrong passphrase?)".into(),
        ));
    }
    Ok(())
}

fn decrypt(
    algorithm: &EncryptionAlgorithm,
    ciphertext: &[u8],
    password: &str,
    bmp_password: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    match algorithm {
        EncryptionAlgorithm::PbeSha1And3Des { salt, iterations } => {
            kdf::decrypt_pbe_sha1_3des(ciphertext, bmp_password, salt, *iterations)
        }
        EncryptionAlgorithm::Pbes2 { salt, iterations, prf, iv } => {
            kdf::decrypt_pbes2(*prf, ciphertext, password, salt, *iterations, iv)
        }
    }
}
