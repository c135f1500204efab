//! Silicon model for the edge CNN accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the IP block as seen from the processing system: register
//! offsets and bit fields, the activation and pooling encodings, and the
//! default board memory map.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Register map: offsets and bit definitions |
//! | [`fields`] | Activation / pooling codes, config and input-dim packing |
//! | [`memmap`] | Default AXI base addresses and DDR buffer regions |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fields;
pub mod memmap;
pub mod regs;

pub use fields::{Activation, PoolType};
