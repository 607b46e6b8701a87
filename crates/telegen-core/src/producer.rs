//! Record producer capability

use crate::error::GenerateError;

/// Source of synthetic records.
///
/// Each call to [`generate`](Producer::generate) serializes exactly one logical
/// record into the producer's own [`Accumulator`](crate::Accumulator) and
/// returns the accumulated size. On error nothing is appended.
pub trait Producer: Send {
    fn generate(&mut self) -> Result<u64, GenerateError>;

    /// Hand back everything generated since the last drain and reset
    fn drain_and_reset(&mut self) -> Vec<u8>;
}

impl<P: Producer + ?Sized> Producer for Box<P> {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        (**self).generate()
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        (**self).drain_and_reset()
    }
}
