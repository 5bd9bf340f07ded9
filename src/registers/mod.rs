//! Register definitions for the SX127x radio
//! Generated from the SX1276/77/78/79 datasheet (Rev. 7), LoRa mode register map

mod common;
mod dio;
mod lora;

pub use common::*;
pub use dio::*;
pub use lora::*;
