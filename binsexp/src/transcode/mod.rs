//! Transcoders between S-expression trees and other formats.

pub mod cbor;
