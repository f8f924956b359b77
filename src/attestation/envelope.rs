// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::attribute::{interpret, AttributeTag, AttributeValue, KeyType, ObjectClass};
use super::errors::Error;
use super::reader::Reader;
use bitmask::*;
use flate2::read::GzDecoder;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

/// Size of the RSA signature that closes every attestation
pub const SIGNATURE_LEN: usize = 256;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

bitmask! {
    #[derive(Debug)]
    pub mask RequestFlagSet: u32 where flags RequestFlag {
        GetAttributes  = 0x0001,
        GetAttestation = 0x0002,
        ExcludeHeader  = 0x0004,
    }
}

const REQUEST_FLAGS: [(RequestFlag, u32, &str); 3] = [
    (RequestFlag::GetAttributes, 0x0001, "get-attributes"),
    (RequestFlag::GetAttestation, 0x0002, "get-attestation"),
    (RequestFlag::ExcludeHeader, 0x0004, "exclude-header"),
];

fn request_flag_set(raw: u32) -> RequestFlagSet {
    let mut set = RequestFlagSet::none();

    for (f, bit, _) in REQUEST_FLAGS.iter() {
        if raw & bit != 0 {
            set.set(*f);
        }
    }

    set
}

fn request_flag_names(raw: u32) -> Vec<&'static str> {
    let set = request_flag_set(raw);

    REQUEST_FLAGS
        .iter()
        .filter(|(f, _, _)| set.contains(*f))
        .map(|(_, _, n)| *n)
        .collect()
}

/// The response header that opens the (decompressed) attestation buffer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResponseHeader {
    pub response_code: u32,
    pub request_flags: u32,
    pub total_size: u32,
    pub buffer_size: u32,
}

impl ResponseHeader {
    fn decode(r: &mut Reader) -> Result<Self, Error> {
        Ok(Self {
            response_code: r.read_u32("response code")?,
            request_flags: r.read_u32("response request flags")?,
            total_size: r.read_u32("total size")?,
            buffer_size: r.read_u32("buffer size")?,
        })
    }

    pub fn flags(&self) -> RequestFlagSet {
        request_flag_set(self.request_flags)
    }

    pub fn flag_names(&self) -> Vec<&'static str> {
        request_flag_names(self.request_flags)
    }
}

/// The header at the start of the attestation data region.  Key object
/// offsets are relative to the start of that region.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InfoHeader {
    pub object_version: u16,
    pub request_flags: u16,
    pub offset_first_key: u16,
    pub offset_second_key: u16,
}

impl InfoHeader {
    fn decode(r: &mut Reader) -> Result<Self, Error> {
        Ok(Self {
            object_version: r.read_u16("object version")?,
            request_flags: r.read_u16("info request flags")?,
            offset_first_key: r.read_u16("first key offset")?,
            offset_second_key: r.read_u16("second key offset")?,
        })
    }

    pub fn flags(&self) -> RequestFlagSet {
        request_flag_set(u32::from(self.request_flags))
    }

    pub fn flag_names(&self) -> Vec<&'static str> {
        request_flag_names(u32::from(self.request_flags))
    }
}

/// A key object: a handle and the set of attributes the module reported for
/// it.  Each tag appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KeyObject {
    pub handle: u32,
    pub attribute_count: u32,
    pub object_size: u32,
    pub attributes: BTreeMap<AttributeTag, AttributeValue>,
}

impl KeyObject {
    fn decode(span: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(span);

        let mut ko = Self {
            handle: r.read_u32("key handle")?,
            attribute_count: r.read_u32("attribute count")?,
            object_size: r.read_u32("object size")?,
            ..Default::default()
        };

        for _ in 0..ko.attribute_count {
            let tag = AttributeTag::from_code(r.read_u32("attribute tag")?);
            let len = r.read_u32("attribute length")?;
            let raw = r.read_exact(len as usize, &format!("{tag} value"))?;

            let v = interpret(tag, raw)?;

            if ko.attributes.insert(tag, v).is_some() {
                return Err(Error::DuplicatedAttribute(format!(
                    "{tag} in key object {:#x}",
                    ko.handle
                )));
            }
        }

        debug!(
            handle = ko.handle,
            attributes = ko.attribute_count,
            "decoded key object"
        );

        Ok(ko)
    }

    pub fn get(&self, tag: AttributeTag) -> Option<&AttributeValue> {
        self.attributes.get(&tag)
    }

    pub fn class(&self) -> Option<ObjectClass> {
        match self.get(AttributeTag::Class) {
            Some(AttributeValue::Class(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn key_type(&self) -> Option<KeyType> {
        match self.get(AttributeTag::KeyType) {
            Some(AttributeValue::KeyType(k)) => Some(*k),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.get(AttributeTag::Label).and_then(|v| v.as_text())
    }

    /// A boolean attribute, absent counting as false
    pub fn flag(&self, tag: AttributeTag) -> bool {
        self.get(tag).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// The raw value of a bytes-typed attribute that must be present
    pub fn bytes(&self, tag: AttributeTag) -> Result<&[u8], Error> {
        self.get(tag)
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| Error::MissingAttribute(format!("{tag}")))
    }
}

/// A decoded attestation.  `signature` is the trailing [`SIGNATURE_LEN`]
/// bytes of the decompressed buffer, `signed_data` everything before it.
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub compressed: bool,
    pub response_header: ResponseHeader,
    pub info_header: InfoHeader,
    pub first_key: KeyObject,
    pub second_key: Option<KeyObject>,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signed_data: Vec<u8>,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub signature: Vec<u8>,
}

impl Envelope {
    /// Decode an attestation buffer, gzip-compressed or not.  Any
    /// inconsistency fails the whole decode.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let compressed = buf.starts_with(&GZIP_MAGIC);

        let data: Cow<[u8]> = if compressed {
            Cow::Owned(gunzip(buf)?)
        } else {
            Cow::Borrowed(buf)
        };

        debug!(compressed, len = data.len(), "decoding attestation");

        let mut r = Reader::new(&data);
        let response_header = ResponseHeader::decode(&mut r)?;

        if u64::from(response_header.buffer_size) + SIGNATURE_LEN as u64
            > u64::from(response_header.total_size)
        {
            return Err(Error::Offset(format!(
                "buffer size {} and signature exceed total size {}",
                response_header.buffer_size, response_header.total_size
            )));
        }

        let buffer_size = response_header.buffer_size as usize;

        let start = buffer_size
            .checked_add(SIGNATURE_LEN)
            .and_then(|n| data.len().checked_sub(n))
            .ok_or_else(|| {
                Error::Offset(format!(
                    "buffer size {} and signature exceed input length {}",
                    buffer_size,
                    data.len()
                ))
            })?;

        // the attestation data region, signature excluded
        let region = &data[start..start + buffer_size];

        let info_header = InfoHeader::decode(&mut Reader::new(region))?;

        let off1 = usize::from(info_header.offset_first_key);
        let off2 = usize::from(info_header.offset_second_key);

        let first_end = if off2 == 0 {
            buffer_size
        } else {
            if off2 <= off1 || off2 >= buffer_size {
                return Err(Error::Offset(format!(
                    "second key offset {off2} not within ({off1}, {buffer_size})"
                )));
            }
            off2
        };

        if off1 > first_end {
            return Err(Error::Offset(format!(
                "first key offset {off1} beyond {first_end}"
            )));
        }

        let first_key = KeyObject::decode(&region[off1..first_end])?;

        let second_key = if off2 == 0 {
            None
        } else {
            Some(KeyObject::decode(&region[off2..buffer_size])?)
        };

        let split = data.len() - SIGNATURE_LEN;

        Ok(Self {
            compressed,
            response_header,
            info_header,
            first_key,
            second_key,
            signed_data: data[..split].to_vec(),
            signature: data[split..].to_vec(),
        })
    }
}

fn gunzip(buf: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();

    GzDecoder::new(buf)
        .read_to_end(&mut out)
        .map_err(|e| Error::Compression(e.to_string()))?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::testutil::{attr, build, key_object};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use hex_literal::hex;
    use std::io::Write;

    const TEST_ATTESTATION_GZ: &[u8] = include_bytes!("../../testdata/attestation-p256.bin.gz");
    const TEST_ATTESTATION: &[u8] = include_bytes!("../../testdata/attestation-p256.bin");

    fn sample_key() -> Vec<u8> {
        key_object(
            0x1234,
            &[
                attr(0x0000, &hex!("02")),
                attr(0x0100, &hex!("03")),
                attr(0x0003, b"signing\0\0\0\0\0"),
                attr(0x0108, &hex!("00")),
                attr(0x010a, &hex!("01")),
                attr(0x0161, &hex!("00000041")),
                attr(0x0173, &hex!("01")),
                attr(0x0000_0170, &hex!("0102")),
            ],
        )
    }

    #[test]
    fn decode_synthetic_ok() {
        let buf = build(&[sample_key()], 0x3);
        let e = Envelope::decode(&buf).unwrap();

        assert!(!e.compressed);
        assert_eq!(e.response_header.response_code, 0);
        assert_eq!(e.response_header.flag_names(), vec!["get-attributes", "get-attestation"]);
        assert_eq!(e.info_header.offset_first_key, 8);
        assert_eq!(e.info_header.offset_second_key, 0);
        assert!(e.second_key.is_none());

        let k = &e.first_key;
        assert_eq!(k.handle, 0x1234);
        assert_eq!(k.attribute_count, 8);
        assert_eq!(k.class(), Some(ObjectClass::PublicKey));
        assert_eq!(k.key_type(), Some(KeyType::Ec));
        assert_eq!(k.label(), Some("signing"));
        assert!(!k.flag(AttributeTag::Sign));
        assert!(k.flag(AttributeTag::Verify));
        assert!(!k.flag(AttributeTag::Derive));
        assert_eq!(
            k.get(AttributeTag::ValueLen),
            Some(&AttributeValue::Number(65))
        );
        assert_eq!(k.bytes(AttributeTag::Kcv).unwrap(), &hex!("01"));
        assert_eq!(
            k.get(AttributeTag::Unknown(0x170)),
            Some(&AttributeValue::Bytes(vec![1, 2]))
        );

        assert_eq!(e.signature.len(), SIGNATURE_LEN);
        assert_eq!(e.signed_data.len(), buf.len() - SIGNATURE_LEN);
        assert_eq!(e.signed_data, &buf[..buf.len() - SIGNATURE_LEN]);
    }

    #[test]
    fn decode_second_key_span() {
        let first = sample_key();
        let second = key_object(0x5678, &[attr(0x0000, &hex!("03"))]);
        let buf = build(&[first.clone(), second], 0x3);

        let e = Envelope::decode(&buf).unwrap();

        assert_eq!(
            usize::from(e.info_header.offset_second_key),
            8 + first.len()
        );

        let k2 = e.second_key.unwrap();
        assert_eq!(k2.handle, 0x5678);
        assert_eq!(k2.class(), Some(ObjectClass::PrivateKey));
    }

    #[test]
    fn decode_gzip() {
        let buf = build(&[sample_key()], 0x3);

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&buf).unwrap();
        let gz = enc.finish().unwrap();

        let plain = Envelope::decode(&buf).unwrap();
        let unzipped = Envelope::decode(&gz).unwrap();

        assert!(unzipped.compressed);
        assert_eq!(unzipped.first_key, plain.first_key);
        assert_eq!(unzipped.signed_data, plain.signed_data);
    }

    #[test]
    fn decode_corrupt_gzip() {
        let buf = hex!("1f8b 0800 0000 0000 00ff deadbeef");
        assert!(matches!(
            Envelope::decode(&buf).unwrap_err(),
            Error::Compression(_)
        ));
    }

    #[test]
    fn decode_duplicated_tag() {
        let k = key_object(1, &[attr(0x0108, &hex!("01")), attr(0x0108, &hex!("00"))]);
        let buf = build(&[k], 0x3);

        assert!(matches!(
            Envelope::decode(&buf).unwrap_err(),
            Error::DuplicatedAttribute(_)
        ));
    }

    #[test]
    fn decode_attribute_overruns_key_object() {
        let mut k = key_object(1, &[attr(0x0003, b"label")]);
        // bump the value length past the end of the key object
        k[19] = 0x40;
        let buf = build(&[k], 0x3);

        assert!(matches!(
            Envelope::decode(&buf).unwrap_err(),
            Error::Truncated(_)
        ));
    }

    #[test]
    fn decode_short_input() {
        assert!(matches!(
            Envelope::decode(&hex!("00000000 00000003")).unwrap_err(),
            Error::Truncated(_)
        ));
    }

    #[test]
    fn decode_buffer_size_too_large() {
        let mut buf = build(&[sample_key()], 0x3);
        // buffer size larger than the input
        buf[12..16].copy_from_slice(&hex!("00010000"));
        buf[8..12].copy_from_slice(&hex!("00020000"));

        assert!(matches!(
            Envelope::decode(&buf).unwrap_err(),
            Error::Offset(_)
        ));
    }

    #[test]
    fn decode_total_size_inconsistent() {
        let mut buf = build(&[sample_key()], 0x3);
        buf[8..12].copy_from_slice(&hex!("00000010"));

        assert!(matches!(
            Envelope::decode(&buf).unwrap_err(),
            Error::Offset(_)
        ));
    }

    #[test]
    fn decode_second_offset_out_of_order() {
        let first = sample_key();
        let second = key_object(2, &[]);
        let mut buf = build(&[first, second], 0x3);
        // info header starts right after the 16-byte response header
        buf[20..22].copy_from_slice(&hex!("0400"));

        assert!(matches!(
            Envelope::decode(&buf).unwrap_err(),
            Error::Offset(_)
        ));
    }

    #[test]
    fn decode_real_attestation() {
        let e = Envelope::decode(TEST_ATTESTATION_GZ).unwrap();

        assert!(e.compressed);
        assert_eq!(
            e.response_header,
            ResponseHeader {
                response_code: 0,
                request_flags: 3,
                total_size: 2112,
                buffer_size: 1824,
            }
        );
        assert!(e.response_header.flags().contains(RequestFlag::GetAttestation));
        assert!(!e.response_header.flags().contains(RequestFlag::ExcludeHeader));
        assert_eq!(
            e.info_header,
            InfoHeader {
                object_version: 1,
                request_flags: 3,
                offset_first_key: 8,
                offset_second_key: 916,
            }
        );

        let k1 = &e.first_key;
        assert_eq!(k1.handle, 0x7e6);
        assert_eq!(k1.attribute_count, 35);
        assert_eq!(k1.object_size, 896);
        assert_eq!(k1.class(), Some(ObjectClass::PublicKey));
        assert_eq!(k1.key_type(), Some(KeyType::Ec));
        assert_eq!(k1.label(), Some("app_key"));
        assert_eq!(
            k1.get(AttributeTag::ValueLen),
            Some(&AttributeValue::Number(65))
        );
        assert_eq!(k1.bytes(AttributeTag::Modulus).unwrap().len(), 65);

        let k2 = e.second_key.as_ref().unwrap();
        assert_eq!(k2.handle, 0x22a6);
        assert_eq!(k2.class(), Some(ObjectClass::PrivateKey));

        assert_eq!(e.signed_data.len(), 2112 - SIGNATURE_LEN);

        let plain = Envelope::decode(TEST_ATTESTATION).unwrap();
        assert!(!plain.compressed);
        assert_eq!(plain.first_key, e.first_key);
        assert_eq!(plain.signature, e.signature);
    }
}
