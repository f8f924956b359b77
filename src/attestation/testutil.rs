// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Builders for synthetic attestation buffers

use super::envelope::SIGNATURE_LEN;

/// One (tag, length, value) attribute entry
pub fn attr(tag: u32, value: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(8 + value.len());
    v.extend_from_slice(&tag.to_be_bytes());
    v.extend_from_slice(&(value.len() as u32).to_be_bytes());
    v.extend_from_slice(value);
    v
}

/// A key object made of the given attribute entries
pub fn key_object(handle: u32, attrs: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = attrs.concat();

    let mut v = Vec::with_capacity(12 + body.len());
    v.extend_from_slice(&handle.to_be_bytes());
    v.extend_from_slice(&(attrs.len() as u32).to_be_bytes());
    v.extend_from_slice(&(body.len() as u32).to_be_bytes());
    v.extend_from_slice(&body);
    v
}

/// A full uncompressed attestation carrying one or two key objects, with a
/// placeholder signature
pub fn build(keys: &[Vec<u8>], flags: u16) -> Vec<u8> {
    let off1: u16 = 8;
    let off2: u16 = match keys {
        [first, _, ..] => off1 + first.len() as u16,
        _ => 0,
    };

    let mut region = Vec::new();
    region.extend_from_slice(&1u16.to_be_bytes());
    region.extend_from_slice(&flags.to_be_bytes());
    region.extend_from_slice(&off1.to_be_bytes());
    region.extend_from_slice(&off2.to_be_bytes());
    for k in keys.iter().take(2) {
        region.extend_from_slice(k);
    }

    let buffer_size = region.len() as u32;
    let total_size = 16 + buffer_size + SIGNATURE_LEN as u32;

    let mut v = Vec::with_capacity(total_size as usize);
    v.extend_from_slice(&0u32.to_be_bytes());
    v.extend_from_slice(&u32::from(flags).to_be_bytes());
    v.extend_from_slice(&total_size.to_be_bytes());
    v.extend_from_slice(&buffer_size.to_be_bytes());
    v.extend_from_slice(&region);
    v.extend_from_slice(&[0xa5; SIGNATURE_LEN]);
    v
}
