/// Type-state markers for the builder pattern
///
/// A connection manager cannot be built before a frame decoder is chosen;
/// the URL is deliberately not part of the type state because it may only
/// become known later (once a credential resolves).

use std::marker::PhantomData;

/// Marker trait for decoder state
pub trait DecoderState {}

/// Decoder has not been set
pub struct NoDecoder;
impl DecoderState for NoDecoder {}

/// Decoder has been set
pub struct HasDecoder;
impl DecoderState for HasDecoder {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<Dc> {
    _decoder: PhantomData<Dc>,
}

impl<Dc> TypeState<Dc> {
    pub(crate) fn new() -> Self {
        Self {
            _decoder: PhantomData,
        }
    }
}
