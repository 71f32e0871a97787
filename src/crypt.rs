//! C6: the standard security handler (ISO 32000-1 §7.6). Derives the
//! file encryption key from a password, derives per-object keys, and
//! transparently decrypts strings and stream payloads.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use md5::{Digest, Md5};
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::object::{Dictionary, DictionaryExt, Object};

/// Table 21 of ISO 32000-1: the fixed 32-byte padding string appended to
/// (or used in place of) an empty/short password for R<=4.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    Rc4,
    AesV2,
    AesV3,
    /// `/V 4|5` with `/CF`-referenced `/Identity` — no encryption on this
    /// stream/string category despite the document being encrypted.
    Identity,
}

#[derive(Debug, Clone, Copy)]
pub struct Permissions(pub i32);

impl Permissions {
    pub fn can_print(&self) -> bool {
        self.0 & (1 << 2) != 0
    }
    pub fn can_modify(&self) -> bool {
        self.0 & (1 << 3) != 0
    }
    pub fn can_copy(&self) -> bool {
        self.0 & (1 << 4) != 0
    }
    pub fn can_annotate(&self) -> bool {
        self.0 & (1 << 5) != 0
    }
    pub fn can_fill_forms(&self) -> bool {
        self.0 & (1 << 8) != 0
    }
    pub fn can_extract_for_accessibility(&self) -> bool {
        self.0 & (1 << 9) != 0
    }
    pub fn can_assemble(&self) -> bool {
        self.0 & (1 << 10) != 0
    }
    pub fn can_print_high_res(&self) -> bool {
        self.0 & (1 << 11) != 0
    }
}

pub struct SecurityHandler {
    file_key: Vec<u8>,
    v: i64,
    r: i64,
    stream_method: CryptMethod,
    string_method: CryptMethod,
    pub permissions: Permissions,
}

impl SecurityHandler {
    /// Builds a handler from the document's `/Encrypt` dictionary and
    /// `/ID[0]`, trying the empty password first (by far the common
    /// case) and falling back to `password`.
    pub fn new(encrypt: &Dictionary, id0: &[u8], password: &[u8]) -> Result<SecurityHandler> {
        let v = encrypt.get_i64("V").unwrap_or(0);
        let r = encrypt.get_i64("R").unwrap_or(2);
        let length_bits = encrypt.get_i64("Length").unwrap_or(40);
        let key_len = (length_bits / 8).max(5) as usize;
        let p = encrypt.get_i64("P").unwrap_or(0) as i32;
        let o = encrypt.get("O").and_then(Object::as_str_bytes).unwrap_or(&[]);
        let u = encrypt.get("U").and_then(Object::as_str_bytes).unwrap_or(&[]);

        if r >= 5 {
            let oe = encrypt.get("OE").and_then(Object::as_str_bytes).unwrap_or(&[]);
            let ue = encrypt.get("UE").and_then(Object::as_str_bytes).unwrap_or(&[]);
            let file_key = derive_key_r6(password, o, u, oe, ue)
                .or_else(|_| derive_key_r6(&[], o, u, oe, ue))
                .map_err(|_| Error::AuthFailure)?;
            let (stream_method, string_method) = crypt_methods_v5(encrypt);
            return Ok(SecurityHandler { file_key, v, r, stream_method, string_method, permissions: Permissions(p) });
        }

        let encrypt_metadata = encrypt.get_bool("EncryptMetadata").unwrap_or(true);
        let try_key = |pwd: &[u8]| -> Vec<u8> {
            derive_file_key_r234(pwd, o, p, id0, r, key_len, encrypt_metadata)
        };
        let mut file_key = try_key(password);
        if !verify_user_password(&file_key, u, id0, r) {
            file_key = try_key(&[]);
            if !verify_user_password(&file_key, u, id0, r) {
                return Err(Error::AuthFailure);
            }
        }
        let (stream_method, string_method) = crypt_methods_v4(encrypt, v);
        Ok(SecurityHandler { file_key, v, r, stream_method, string_method, permissions: Permissions(p) })
    }

    pub fn is_aes(&self) -> bool {
        matches!(self.stream_method, CryptMethod::AesV2 | CryptMethod::AesV3)
    }

    /// Decrypts a stream's raw payload, keyed by its owning object
    /// number/generation.
    pub fn decrypt_stream(&self, num: u32, gen: u16, data: &[u8]) -> Result<Vec<u8>> {
        self.decrypt(num, gen, data, self.stream_method)
    }

    pub fn decrypt_string(&self, num: u32, gen: u16, data: &[u8]) -> Result<Vec<u8>> {
        self.decrypt(num, gen, data, self.string_method)
    }

    fn decrypt(&self, num: u32, gen: u16, data: &[u8], method: CryptMethod) -> Result<Vec<u8>> {
        if method == CryptMethod::Identity {
            return Ok(data.to_vec());
        }
        let key = if self.r >= 5 { self.file_key.clone() } else { self.object_key(num, gen, method) };
        match method {
            CryptMethod::Rc4 => Ok(rc4(&key, data)),
            CryptMethod::AesV2 | CryptMethod::AesV3 => aes_cbc_decrypt(&key, data),
            CryptMethod::Identity => unreachable!(),
        }
    }

    /// §7.6.2 algorithm 1: per-object key = truncate(MD5(file_key ||
    /// low-3-bytes(num) || low-2-bytes(gen) [|| "sAlT" if AES]),
    /// min(key_len+5, 16)).
    fn object_key(&self, num: u32, gen: u16, method: CryptMethod) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(&self.file_key);
        hasher.update(&num.to_le_bytes()[0..3]);
        hasher.update(&gen.to_le_bytes()[0..2]);
        if method == CryptMethod::AesV2 {
            hasher.update(b"sAlT");
        }
        let digest = hasher.finalize();
        let n = (self.file_key.len() + 5).min(16);
        digest[0..n].to_vec()
    }
}

fn crypt_methods_v4(encrypt: &Dictionary, v: i64) -> (CryptMethod, CryptMethod) {
    if v < 4 {
        return (CryptMethod::Rc4, CryptMethod::Rc4);
    }
    let cf = encrypt.get_dict("CF");
    let resolve = |name: &str| -> CryptMethod {
        match name {
            "Identity" => CryptMethod::Identity,
            _ => {
                let cfm = cf
                    .and_then(|cf| cf.get_dict(name))
                    .and_then(|d| d.get_str("CFM"))
                    .unwrap_or("V2");
                match cfm {
                    "AESV2" => CryptMethod::AesV2,
                    "AESV3" => CryptMethod::AesV3,
                    _ => CryptMethod::Rc4,
                }
            }
        }
    };
    let stmf = encrypt.get_str("StmF").unwrap_or("Identity");
    let strf = encrypt.get_str("StrF").unwrap_or("Identity");
    (resolve(stmf), resolve(strf))
}

fn crypt_methods_v5(encrypt: &Dictionary) -> (CryptMethod, CryptMethod) {
    // R5/R6 security handlers only ever define AESV3 filters.
    let _ = encrypt;
    (CryptMethod::AesV3, CryptMethod::AesV3)
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = password.len().min(32);
    out[..n].copy_from_slice(&password[..n]);
    out[n..].copy_from_slice(&PASSWORD_PAD[..32 - n]);
    out
}

/// §7.6.3.3 Algorithm 2: compute the file encryption key from a
/// (padded) password, /O, /P and /ID[0].
fn derive_file_key_r234(password: &[u8], o: &[u8], p: i32, id0: &[u8], r: i64, key_len: usize, encrypt_metadata: bool) -> Vec<u8> {
    let padded = pad_password(password);
    let mut hasher = Md5::new();
    hasher.update(padded);
    hasher.update(&o[..o.len().min(32)]);
    hasher.update(p.to_le_bytes());
    hasher.update(id0);
    if r >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut digest = hasher.finalize().to_vec();
    if r >= 3 {
        for _ in 0..50 {
            let mut h = Md5::new();
            h.update(&digest[..key_len.min(digest.len())]);
            digest = h.finalize().to_vec();
        }
    }
    digest.truncate(key_len);
    digest
}

/// §7.6.3.4 Algorithm 4/5: recompute /U and compare, to verify the
/// (empty-or-supplied) password derived the correct file key.
fn verify_user_password(file_key: &[u8], u: &[u8], id0: &[u8], r: i64) -> bool {
    if r == 2 {
        let computed = rc4(file_key, &PASSWORD_PAD);
        computed.len() >= 32 && u.len() >= 16 && computed[..16] == u[..16]
    } else {
        let mut hasher = Md5::new();
        hasher.update(PASSWORD_PAD);
        hasher.update(id0);
        let digest = hasher.finalize();
        let mut buf = digest.to_vec();
        buf = rc4(file_key, &buf);
        for i in 1..=19u8 {
            let round_key: Vec<u8> = file_key.iter().map(|b| b ^ i).collect();
            buf = rc4(&round_key, &buf);
        }
        u.len() >= 16 && buf.len() >= 16 && buf[..16] == u[..16]
    }
}

/// §7.6.4.3 (R6) key derivation via SHA-256 hardened hashing. Tries the
/// user path first, falling back to the owner path.
fn derive_key_r6(password: &[u8], o: &[u8], u: &[u8], oe: &[u8], ue: &[u8]) -> Result<Vec<u8>> {
    let pw = normalize_password_r6(password);
    if u.len() >= 48 {
        let (hash, validation_salt, key_salt) = (&u[0..32], &u[32..40], &u[40..48]);
        let computed = hash_r6(&pw, validation_salt, &[]);
        if computed == hash {
            let intermediate = hash_r6(&pw, key_salt, &[]);
            if ue.len() >= 32 {
                return Ok(aes_cbc_no_padding_decrypt(&intermediate, &[0u8; 16], ue));
            }
        }
    }
    if o.len() >= 48 {
        let (hash, validation_salt, key_salt) = (&o[0..32], &o[32..40], &o[40..48]);
        let computed = hash_r6(&pw, validation_salt, u);
        if computed == hash {
            let intermediate = hash_r6(&pw, key_salt, u);
            if oe.len() >= 32 {
                return Ok(aes_cbc_no_padding_decrypt(&intermediate, &[0u8; 16], oe));
            }
        }
    }
    Err(Error::AuthFailure)
}

/// SASLprep-lite normalization per §7.6.4.3.2: stringprep then UTF-8,
/// truncated to 127 bytes. Falls back to the raw bytes if stringprep
/// rejects the input (e.g. it's not valid UTF-8 to begin with).
fn normalize_password_r6(password: &[u8]) -> Vec<u8> {
    match std::str::from_utf8(password) {
        Ok(s) => {
            let mut buf = s.to_string();
            match stringprep::saslprep(&buf) {
                Ok(normalized) => buf = normalized.into_owned(),
                Err(_) => {}
            }
            let mut bytes = buf.into_bytes();
            bytes.truncate(127);
            bytes
        }
        Err(_) => password.to_vec(),
    }
}

/// Algorithm 2.B: the iterated SHA-256/384/512 hash used by R6.
fn hash_r6(password: &[u8], salt: &[u8], extra: &[u8]) -> Vec<u8> {
    let mut k = {
        let mut h = Sha256::new();
        h.update(password);
        h.update(salt);
        h.update(extra);
        h.finalize().to_vec()
    };
    let mut round = 0;
    loop {
        let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + extra.len()));
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            k1.extend_from_slice(extra);
        }
        let e = aes_cbc_no_padding_encrypt(&k[0..16], &k[16..32], &k1);
        let modulus: u32 = e[0..16].iter().map(|&b| b as u32).sum::<u32>() % 3;
        k = match modulus {
            0 => {
                let mut h = Sha256::new();
                h.update(&e);
                h.finalize().to_vec()
            }
            1 => {
                use sha2::Sha384;
                let mut h = Sha384::new();
                h.update(&e);
                h.finalize().to_vec()
            }
            _ => {
                use sha2::Sha512;
                let mut h = Sha512::new();
                h.update(&e);
                h.finalize().to_vec()
            }
        };
        round += 1;
        if round >= 64 && (*e.last().unwrap_or(&0) as usize) <= round - 32 {
            break;
        }
        if round > 512 {
            break;
        }
    }
    k.truncate(32);
    k
}

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

fn aes_cbc_no_padding_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    let enc = Aes128CbcEnc::new(key.into(), iv.into());
    let mut buf = data.to_vec();
    // data is always a multiple of 16 bytes here (64 * fixed-size input)
    enc.encrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf, data.len())
        .map(|s| s.to_vec())
        .unwrap_or(buf)
}

fn aes_cbc_no_padding_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    if key.len() == 32 {
        let dec = Aes256CbcDec::new(key.into(), iv.into());
        dec.decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf)
            .map(|s| s.to_vec())
            .unwrap_or_else(|_| data.to_vec())
    } else {
        let dec = Aes128CbcDec::new(key.into(), iv.into());
        dec.decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf)
            .map(|s| s.to_vec())
            .unwrap_or_else(|_| data.to_vec())
    }
}

/// Per-stream/string AES: the first 16 bytes of `data` are the IV,
/// PKCS#7-padded ciphertext follows (§7.6.2).
fn aes_cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 16 {
        return Ok(Vec::new());
    }
    let (iv, ciphertext) = data.split_at(16);
    let mut buf = ciphertext.to_vec();
    let decrypted = if key.len() == 32 {
        let dec = Aes256CbcDec::new(key.into(), iv.into());
        dec.decrypt_padded_mut::<Pkcs7>(&mut buf)
    } else {
        let dec = Aes128CbcDec::new(key.into(), iv.into());
        dec.decrypt_padded_mut::<Pkcs7>(&mut buf)
    };
    match decrypted {
        Ok(plain) => Ok(plain.to_vec()),
        Err(_) => Ok(Vec::new()),
    }
}

/// Unkeyed, streaming RC4 — not pulled in as a dependency since no pack
/// repo reaches for one either; the algorithm is ~15 lines.
fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = [0; 256];
    for (i, v) in s.iter_mut().enumerate() {
        *v = i as u8;
    }
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let mut out = Vec::with_capacity(data.len());
    let (mut i, mut j) = (0u8, 0u8);
    for &byte in data {
        i = i.wrapping_add(1);
        j = j.wrapping_add(s[i as usize]);
        s.swap(i as usize, j as usize);
        let k = s[(s[i as usize].wrapping_add(s[j as usize])) as usize];
        out.push(byte ^ k);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc4_roundtrips() {
        let key = b"secretkey";
        let plain = b"Secret message";
        let cipher = rc4(key, plain);
        let back = rc4(key, &cipher);
        assert_eq!(back, plain);
    }

    #[test]
    fn padding_fills_short_password() {
        let padded = pad_password(b"abc");
        assert_eq!(&padded[0..3], b"abc");
        assert_eq!(&padded[3..], &PASSWORD_PAD[..29]);
    }

    #[test]
    fn permissions_decode_print_bit() {
        let perms = Permissions(-4); // all bits set except bit0/1 (reserved)
        assert!(perms.can_print());
        assert!(perms.can_modify());
    }
}
