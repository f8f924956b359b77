// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::{Serialize, Serializer};
use std::fmt;

/// PKCS#11-style key attribute tags carried in a key object.  Any code that
/// is not listed here decodes as [`AttributeTag::Unknown`] and its value is
/// kept as raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeTag {
    Class,
    Token,
    Private,
    Label,
    Trusted,
    KeyType,
    Id,
    Sensitive,
    Encrypt,
    Decrypt,
    Wrap,
    Unwrap,
    Sign,
    Verify,
    Derive,
    Modulus,
    ModulusBits,
    PublicExponent,
    ValueLen,
    Extractable,
    Local,
    NeverExtractable,
    AlwaysSensitive,
    Kcv,
    ExtAttr1,
    Ekcv,
    WrapWithTrusted,
    Splittable,
    IsSplit,
    EncryptMechanisms,
    DecryptMechanisms,
    SignMechanisms,
    VerifyMechanisms,
    WrapMechanisms,
    UnwrapMechanisms,
    DeriveMechanisms,
    Unknown(u32),
}

const TAG_REGISTRY: [(AttributeTag, u32, &str); 36] = [
    (AttributeTag::Class, 0x0000, "OBJ_ATTR_CLASS"),
    (AttributeTag::Token, 0x0001, "OBJ_ATTR_TOKEN"),
    (AttributeTag::Private, 0x0002, "OBJ_ATTR_PRIVATE"),
    (AttributeTag::Label, 0x0003, "OBJ_ATTR_LABEL"),
    (AttributeTag::Trusted, 0x0086, "OBJ_ATTR_TRUSTED"),
    (AttributeTag::KeyType, 0x0100, "OBJ_ATTR_KEY_TYPE"),
    (AttributeTag::Id, 0x0102, "OBJ_ATTR_ID"),
    (AttributeTag::Sensitive, 0x0103, "OBJ_ATTR_SENSITIVE"),
    (AttributeTag::Encrypt, 0x0104, "OBJ_ATTR_ENCRYPT"),
    (AttributeTag::Decrypt, 0x0105, "OBJ_ATTR_DECRYPT"),
    (AttributeTag::Wrap, 0x0106, "OBJ_ATTR_WRAP"),
    (AttributeTag::Unwrap, 0x0107, "OBJ_ATTR_UNWRAP"),
    (AttributeTag::Sign, 0x0108, "OBJ_ATTR_SIGN"),
    (AttributeTag::Verify, 0x010a, "OBJ_ATTR_VERIFY"),
    (AttributeTag::Derive, 0x010c, "OBJ_ATTR_DERIVE"),
    (AttributeTag::Modulus, 0x0120, "OBJ_ATTR_MODULUS"),
    (AttributeTag::ModulusBits, 0x0121, "OBJ_ATTR_MODULUS_BITS"),
    (AttributeTag::PublicExponent, 0x0122, "OBJ_ATTR_PUBLIC_EXPONENT"),
    (AttributeTag::ValueLen, 0x0161, "OBJ_ATTR_VALUE_LEN"),
    (AttributeTag::Extractable, 0x0162, "OBJ_ATTR_EXTRACTABLE"),
    (AttributeTag::Local, 0x0163, "OBJ_ATTR_LOCAL"),
    (AttributeTag::NeverExtractable, 0x0164, "OBJ_ATTR_NEVER_EXTRACTABLE"),
    (AttributeTag::AlwaysSensitive, 0x0165, "OBJ_ATTR_ALWAYS_SENSITIVE"),
    (AttributeTag::Kcv, 0x0173, "OBJ_ATTR_KCV"),
    (AttributeTag::ExtAttr1, 0x1000, "OBJ_EXT_ATTR1"),
    (AttributeTag::Ekcv, 0x1003, "OBJ_ATTR_EKCV"),
    (AttributeTag::WrapWithTrusted, 0x0210, "OBJ_ATTR_WRAP_WITH_TRUSTED"),
    (AttributeTag::Splittable, 0x8000_0002, "OBJ_ATTR_SPLITTABLE"),
    (AttributeTag::IsSplit, 0x8000_0003, "OBJ_ATTR_IS_SPLIT"),
    (AttributeTag::EncryptMechanisms, 0x8000_0174, "OBJ_ATTR_ENCRYPT_KEY_MECHANISMS"),
    (AttributeTag::DecryptMechanisms, 0x8000_0175, "OBJ_ATTR_DECRYPT_KEY_MECHANISMS"),
    (AttributeTag::SignMechanisms, 0x8000_0176, "OBJ_ATTR_SIGN_KEY_MECHANISMS"),
    (AttributeTag::VerifyMechanisms, 0x8000_0177, "OBJ_ATTR_VERIFY_KEY_MECHANISMS"),
    (AttributeTag::WrapMechanisms, 0x8000_0178, "OBJ_ATTR_WRAP_KEY_MECHANISMS"),
    (AttributeTag::UnwrapMechanisms, 0x8000_0179, "OBJ_ATTR_UNWRAP_KEY_MECHANISMS"),
    (AttributeTag::DeriveMechanisms, 0x8000_0180, "OBJ_ATTR_DERIVE_KEY_MECHANISMS"),
];

/// How the value bytes of a given tag are to be read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    Bool,
    Text,
    Number,
    Class,
    KeyType,
    Bytes,
}

impl AttributeTag {
    /// Map a wire code to its tag
    pub fn from_code(code: u32) -> Self {
        TAG_REGISTRY
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(t, _, _)| *t)
            .unwrap_or(AttributeTag::Unknown(code))
    }

    /// The wire code of this tag
    pub fn code(&self) -> u32 {
        match self {
            AttributeTag::Unknown(c) => *c,
            known => TAG_REGISTRY
                .iter()
                .find(|(t, _, _)| t == known)
                .map(|(_, c, _)| *c)
                .unwrap_or_default(),
        }
    }

    fn name(&self) -> Option<&'static str> {
        TAG_REGISTRY
            .iter()
            .find(|(t, _, _)| t == self)
            .map(|(_, _, n)| *n)
    }

    fn rule(&self) -> Rule {
        match self {
            AttributeTag::Token
            | AttributeTag::Private
            | AttributeTag::Trusted
            | AttributeTag::Sensitive
            | AttributeTag::Encrypt
            | AttributeTag::Decrypt
            | AttributeTag::Wrap
            | AttributeTag::Unwrap
            | AttributeTag::Sign
            | AttributeTag::Verify
            | AttributeTag::Derive
            | AttributeTag::Extractable
            | AttributeTag::Local
            | AttributeTag::NeverExtractable
            | AttributeTag::AlwaysSensitive
            | AttributeTag::WrapWithTrusted
            | AttributeTag::Splittable
            | AttributeTag::IsSplit => Rule::Bool,

            AttributeTag::Label | AttributeTag::Id => Rule::Text,

            AttributeTag::ModulusBits | AttributeTag::ValueLen => Rule::Number,

            AttributeTag::Class => Rule::Class,
            AttributeTag::KeyType => Rule::KeyType,

            AttributeTag::Modulus
            | AttributeTag::PublicExponent
            | AttributeTag::Kcv
            | AttributeTag::ExtAttr1
            | AttributeTag::Ekcv
            | AttributeTag::EncryptMechanisms
            | AttributeTag::DecryptMechanisms
            | AttributeTag::SignMechanisms
            | AttributeTag::VerifyMechanisms
            | AttributeTag::WrapMechanisms
            | AttributeTag::UnwrapMechanisms
            | AttributeTag::DeriveMechanisms
            | AttributeTag::Unknown(_) => Rule::Bytes,
        }
    }
}

impl fmt::Display for AttributeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(n) => f.write_str(n),
            None => write!(f, "0x{:08x}", self.code()),
        }
    }
}

impl Serialize for AttributeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// PKCS#11 object classes, indexed by the first byte of the class attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Data,
    Certificate,
    PublicKey,
    PrivateKey,
    SecretKey,
    HwFeature,
    DomainParameters,
    Mechanism,
    OtpKey,
    Unknown(u8),
}

const OBJECT_CLASSES: [(ObjectClass, &str); 9] = [
    (ObjectClass::Data, "CKO_DATA"),
    (ObjectClass::Certificate, "CKO_CERTIFICATE"),
    (ObjectClass::PublicKey, "CKO_PUBLIC_KEY"),
    (ObjectClass::PrivateKey, "CKO_PRIVATE_KEY"),
    (ObjectClass::SecretKey, "CKO_SECRET_KEY"),
    (ObjectClass::HwFeature, "CKO_HW_FEATURE"),
    (ObjectClass::DomainParameters, "CKO_DOMAIN_PARAMETERS"),
    (ObjectClass::Mechanism, "CKO_MECHANISM"),
    (ObjectClass::OtpKey, "CKO_OTP_KEY"),
];

impl From<u8> for ObjectClass {
    fn from(v: u8) -> Self {
        OBJECT_CLASSES
            .get(usize::from(v))
            .map(|(c, _)| *c)
            .unwrap_or(ObjectClass::Unknown(v))
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match OBJECT_CLASSES.iter().find(|(c, _)| c == self) {
            Some((_, n)) => f.write_str(n),
            None => match self {
                ObjectClass::Unknown(v) => write!(f, "unknown (0x{v:02x})"),
                _ => f.write_str("unknown"),
            },
        }
    }
}

/// PKCS#11 key types, indexed by the first byte of the key-type attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    Rsa,
    Dsa,
    Dh,
    Ec,
    X942Dh,
    Kea,
    GenericSecret,
    Rc2,
    Rc4,
    Des,
    Des2,
    Des3,
    Cast,
    Cast3,
    Cast128,
    Rc5,
    Idea,
    Skipjack,
    Baton,
    Juniper,
    Cdmf,
    Aes,
    Blowfish,
    Twofish,
    SecurId,
    Hotp,
    Acti,
    Camellia,
    Aria,
    Unknown(u8),
}

const KEY_TYPES: [(KeyType, u8, &str); 29] = [
    (KeyType::Rsa, 0x00, "CKK_RSA"),
    (KeyType::Dsa, 0x01, "CKK_DSA"),
    (KeyType::Dh, 0x02, "CKK_DH"),
    (KeyType::Ec, 0x03, "CKK_EC"),
    (KeyType::X942Dh, 0x04, "CKK_X9_42_DH"),
    (KeyType::Kea, 0x05, "CKK_KEA"),
    (KeyType::GenericSecret, 0x10, "CKK_GENERIC_SECRET"),
    (KeyType::Rc2, 0x11, "CKK_RC2"),
    (KeyType::Rc4, 0x12, "CKK_RC4"),
    (KeyType::Des, 0x13, "CKK_DES"),
    (KeyType::Des2, 0x14, "CKK_DES2"),
    (KeyType::Des3, 0x15, "CKK_DES3"),
    (KeyType::Cast, 0x16, "CKK_CAST"),
    (KeyType::Cast3, 0x17, "CKK_CAST3"),
    (KeyType::Cast128, 0x18, "CKK_CAST128"),
    (KeyType::Rc5, 0x19, "CKK_RC5"),
    (KeyType::Idea, 0x1a, "CKK_IDEA"),
    (KeyType::Skipjack, 0x1b, "CKK_SKIPJACK"),
    (KeyType::Baton, 0x1c, "CKK_BATON"),
    (KeyType::Juniper, 0x1d, "CKK_JUNIPER"),
    (KeyType::Cdmf, 0x1e, "CKK_CDMF"),
    (KeyType::Aes, 0x1f, "CKK_AES"),
    (KeyType::Blowfish, 0x20, "CKK_BLOWFISH"),
    (KeyType::Twofish, 0x21, "CKK_TWOFISH"),
    (KeyType::SecurId, 0x22, "CKK_SECURID"),
    (KeyType::Hotp, 0x23, "CKK_HOTP"),
    (KeyType::Acti, 0x24, "CKK_ACTI"),
    (KeyType::Camellia, 0x25, "CKK_CAMELLIA"),
    (KeyType::Aria, 0x26, "CKK_ARIA"),
];

impl From<u8> for KeyType {
    fn from(v: u8) -> Self {
        KEY_TYPES
            .iter()
            .find(|(_, c, _)| *c == v)
            .map(|(k, _, _)| *k)
            .unwrap_or(KeyType::Unknown(v))
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match KEY_TYPES.iter().find(|(k, _, _)| k == self) {
            Some((_, _, n)) => f.write_str(n),
            None => match self {
                KeyType::Unknown(v) => write!(f, "unknown (0x{v:02x})"),
                _ => f.write_str("unknown"),
            },
        }
    }
}

impl Serialize for ObjectClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for KeyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A decoded attribute value.  Which variant a value takes is decided by
/// its tag alone.
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
    Number(u32),
    Class(ObjectClass),
    KeyType(KeyType),
    Bytes(#[serde_as(as = "serde_with::hex::Hex")] Vec<u8>),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u32> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Class(c) => write!(f, "{c}"),
            AttributeValue::KeyType(k) => write!(f, "{k}"),
            AttributeValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

/// Decode the raw value bytes of an attribute according to the rule
/// registered for its tag.
pub fn interpret(tag: AttributeTag, raw: &[u8]) -> Result<AttributeValue, Error> {
    let v = match tag.rule() {
        Rule::Bool => AttributeValue::Bool(first_byte(tag, raw)? != 0),
        Rule::Text => AttributeValue::Text(to_text(raw)),
        Rule::Number => AttributeValue::Number(to_u32(tag, raw)?),
        Rule::Class => AttributeValue::Class(ObjectClass::from(first_byte(tag, raw)?)),
        Rule::KeyType => AttributeValue::KeyType(KeyType::from(first_byte(tag, raw)?)),
        Rule::Bytes => AttributeValue::Bytes(raw.to_vec()),
    };

    Ok(v)
}

fn first_byte(tag: AttributeTag, raw: &[u8]) -> Result<u8, Error> {
    raw.first()
        .copied()
        .ok_or_else(|| Error::Attribute(format!("{tag}: empty value")))
}

fn to_u32(tag: AttributeTag, raw: &[u8]) -> Result<u32, Error> {
    match raw {
        [a, b, c, d, ..] => Ok(u32::from_be_bytes([*a, *b, *c, *d])),
        _ => Err(Error::Attribute(format!(
            "{tag}: expecting at least 4 bytes, got {}",
            raw.len()
        ))),
    }
}

// fixed-size text fields are NUL padded
fn to_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
