//! Share tokens: a full section list snapshot, signed for tamper-evidence

pub mod codec;

pub use codec::TokenCodec;
