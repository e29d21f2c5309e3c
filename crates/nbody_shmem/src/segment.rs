//! Word layout of one PE's segment in an `f64` shared window.
//!
//! Word 0 holds the PE's fault marker, followed by `n` bodies of
//! `BODY_WORDS` words each. Every PE allocates the same layout, so an
//! offset computed on one PE addresses the same body on any other.

use bytemuck::{cast, cast_slice};
use nbody_core::{Body, BODY_WORDS};

use crate::error::StoreError;

/// Words ahead of the first body
pub const HEADER_WORDS: usize = 1;

/// Marker value meaning no fault was raised
const CLEAR: f64 = -1.0;

/// Segment length in words for `n` bodies
pub fn segment_len(n: usize) -> usize {
    HEADER_WORDS + n * BODY_WORDS
}

/// Zero every body and clear the fault marker
pub fn reset(segment: &mut [f64]) {
    segment.fill(0.0);
    if let Some(marker) = segment.first_mut() {
        *marker = CLEAR;
    }
}

fn body_words(segment: &[f64], index: usize) -> Result<&[f64], StoreError> {
    let n = (segment.len().saturating_sub(HEADER_WORDS)) / BODY_WORDS;
    if index >= n {
        return Err(StoreError::IndexOutOfRange { index, n });
    }
    let base = HEADER_WORDS + index * BODY_WORDS;
    Ok(&segment[base..base + BODY_WORDS])
}

pub fn read_body(segment: &[f64], index: usize) -> Result<Body, StoreError> {
    let words = body_words(segment, index)?;
    Ok(cast_slice::<f64, Body>(words)[0])
}

pub fn write_body(segment: &mut [f64], index: usize, body: Body) -> Result<(), StoreError> {
    body_words(segment, index)?;
    let base = HEADER_WORDS + index * BODY_WORDS;
    let words: [f64; BODY_WORDS] = cast(body);
    segment[base..base + BODY_WORDS].copy_from_slice(&words);
    Ok(())
}

/// Fault index recorded in a segment, if any
pub fn fault(segment: &[f64]) -> Option<usize> {
    match segment.first() {
        Some(&marker) if marker >= 0.0 => Some(marker as usize),
        _ => None,
    }
}

/// Record `index` in the segment's marker, keeping the lowest seen
pub fn raise(segment: &mut [f64], index: usize) {
    let lowest = fault(segment).map_or(index, |current| current.min(index));
    if let Some(marker) = segment.first_mut() {
        *marker = lowest as f64;
    }
}
