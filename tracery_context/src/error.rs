// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The context error taxonomy and last-error recording.

use core::fmt;

/// Errors surfaced by context operations.
///
/// Errors are recorded on the context (overwriting the previous one, never
/// accumulating) and the failing call returns a documented default value;
/// clients retrieve the error later with
/// [`Context::take_error`](crate::Context::take_error). Nothing in this
/// crate panics on a client mistake.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The handle is invalid, stale, or names an object of the wrong kind.
    BadHandle,
    /// An enum value, element count, or numeric input was out of range.
    IllegalArgument,
    /// Growing a table, pool, or auxiliary array failed. Any partially
    /// constructed object has been unwound before this is recorded.
    OutOfMemory,
    /// The target image is still locked by an external consumer.
    ImageInUse,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadHandle => f.write_str("bad object handle"),
            Self::IllegalArgument => f.write_str("illegal argument"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::ImageInUse => f.write_str("image in use by an external consumer"),
        }
    }
}

impl core::error::Error for Error {}

impl From<tracery_pool::PoolOutOfMemory> for Error {
    fn from(_: tracery_pool::PoolOutOfMemory) -> Self {
        Self::OutOfMemory
    }
}

impl From<tracery_glyph::GlyphOutOfMemory> for Error {
    fn from(_: tracery_glyph::GlyphOutOfMemory) -> Self {
        Self::OutOfMemory
    }
}
