#![forbid(unsafe_code)]

//! DER encoding of PKCS#12 (PFX) containers.
//!
//! Output matches what current OpenSSL writes by default: certificates in
//! a PBES2-encrypted `encryptedData`, the key in a PBES2 shrouded key bag
//! (PBKDF2-HMAC-SHA256, AES-256-CBC) and an HMAC-SHA256 integrity MAC.

use crate::kdf::{self, KdfHash, Prf};
use crate::oid::{self, oid};
use rand::RngCore;
use termo_core::Error;
use yasna::{DERWriter, Tag};

/// PBKDF2 and MAC iteration count.
pub const DEFAULT_ITERATIONS: u32 = 2048;

struct Pbes2Params {
    salt: [u8; 16],
    iv: [u8; 16],
    iterations: u32,
}

impl Pbes2Params {
    fn random(iterations: u32) -> Self {
        let mut rng = rand::thread_rng();
        let mut params = Self {
            salt: [0; 16],
            iv: [0; 16],
            iterations,
        };
        rng.fill_bytes(&mut params.salt);
        rng.fill_bytes(&mut params.iv);
        params
    }

    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, Error> {
        kdf::encrypt_pbes2(Prf::HmacSha256, plaintext, password, &self.salt, self.iterations, &self.iv)
    }

    fn write_algorithm(&self, w: DERWriter) {
        w.write_sequence(|w| {
            w.next().write_oid(&oid(oid::PBES2));
            w.next().write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oid::PBKDF2));
                    w.next().write_sequence(|w| {
                        w.next().write_bytes(&self.salt);
                        w.next().write_u32(self.iterations);
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&oid(oid::HMAC_SHA256));
                            w.next().write_null();
                        });
                    });
                });
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oid::AES_256_CBC));
                    w.next().write_bytes(&self.iv);
                });
            });
        });
    }
}

/// Build a password-protected PFX from a PKCS#8 private key (optional)
/// and DER certificates, leaf first.
pub fn encode_pfx(
    private_key_pkcs8: Option<&[u8]>,
    certificates: &[Vec<u8>],
    password: &str,
    iterations: u32,
) -> Result<Vec<u8>, Error> {
    let mut content_infos = Vec::new();

    if !certificates.is_empty() {
        let safe_contents = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                for der in certificates {
                    write_cert_bag(w.next(), der);
                }
            });
        });
        let params = Pbes2Params::random(iterations);
        let ciphertext = params.encrypt(&safe_contents, password)?;
        content_infos.push(yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_oid(&oid(oid::ENCRYPTED_DATA));
                w.next().write_tagged(Tag::context(0), |w| {
                    w.write_sequence(|w| {
                        w.next().write_u32(0);
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&oid(oid::DATA));
                            params.write_algorithm(w.next());
                            w.next()
                                .write_tagged_implicit(Tag::context(0), |w| w.write_bytes(&ciphertext));
                        });
                    });
                });
            });
        }));
    }

    if let Some(key) = private_key_pkcs8 {
        let params = Pbes2Params::random(iterations);
        let ciphertext = params.encrypt(key, password)?;
        let safe_contents = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oid::PKCS8_SHROUDED_KEY_BAG));
                    w.next().write_tagged(Tag::context(0), |w| {
                        w.write_sequence(|w| {
                            params.write_algorithm(w.next());
                            w.next().write_bytes(&ciphertext);
                        });
                    });
                });
            });
        });
        content_infos.push(data_content_info(&safe_contents));
    }

    let auth_safe = yasna::construct_der(|w| {
        w.write_sequence(|w| {
            for content_info in &content_infos {
                w.next().write_der(content_info);
            }
        });
    });

    let mut mac_salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut mac_salt);
    let bmp_password = kdf::password_to_bmp(password);
    let mac_key = kdf::pkcs12_kdf(KdfHash::Sha256, kdf::ID_MAC, &bmp_password, &mac_salt, iterations, 32);
    let mac = kdf::compute_mac(KdfHash::Sha256, &mac_key, &auth_safe)?;

    Ok(yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_u32(3);
            w.next().write_der(&data_content_info(&auth_safe));
            w.next().write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(oid::SHA256));
                        w.next().write_null();
                    });
                    w.next().write_bytes(&mac);
                });
                w.next().write_bytes(&mac_salt);
                w.next().write_u32(iterations);
            });
        });
    }))
}

fn write_cert_bag(w: DERWriter, der: &[u8]) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(oid::CERT_BAG));
        w.next().write_tagged(Tag::context(0), |w| {
            w.write_sequence(|w| {
                w.next().write_oid(&oid(oid::X509_CERTIFICATE));
                w.next().write_tagged(Tag::context(0), |w| w.write_bytes(der));
            });
        });
    });
}

fn data_content_info(content: &[u8]) -> Vec<u8> {
    yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_oid(&oid(oid::DATA));
            w.next().write_tagged(Tag::context(0), |w| w.write_bytes(content));
        });
    })
}
