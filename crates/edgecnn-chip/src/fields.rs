//! Encodings of the CONFIG and INPUT_DIM registers.

use crate::regs::config;

/// Largest supported input width or height, in pixels.
pub const MAX_INPUT_DIM: u16 = 224;

/// Largest number of output classes the logit buffer holds.
pub const MAX_CLASSES: u8 = 100;

/// All eight hardware layers enabled.
pub const ALL_LAYERS: u8 = 0xFF;

/// Activation function applied after each convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum Activation {
    /// Identity.
    None = 0,
    /// `max(0, x)`.
    #[default]
    Relu = 1,
    /// `min(max(0, x), 6)`.
    Relu6 = 2,
    /// `x` for positive inputs, `x / 8` otherwise.
    LeakyRelu = 3,
    /// Logistic sigmoid.
    Sigmoid = 4,
    /// Hyperbolic tangent.
    Tanh = 5,
    /// `x * sigmoid(x)`.
    Swish = 6,
}

impl Activation {
    /// Every activation, in code order.
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::Relu,
        Self::Relu6,
        Self::LeakyRelu,
        Self::Sigmoid,
        Self::Tanh,
        Self::Swish,
    ];

    /// Register encoding.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Decode a 3-bit register field. Code 7 is reserved.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Relu),
            2 => Some(Self::Relu6),
            3 => Some(Self::LeakyRelu),
            4 => Some(Self::Sigmoid),
            5 => Some(Self::Tanh),
            6 => Some(Self::Swish),
            _ => None,
        }
    }
}

/// Pooling applied between layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum PoolType {
    /// Max pooling.
    #[default]
    Max = 0,
    /// Average pooling.
    Avg = 1,
}

impl PoolType {
    /// Register encoding.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
}

/// Pack the CONFIG register: layer enables in bits 0-7, activation in 8-10,
/// pooling type in bit 11.
#[must_use]
pub const fn pack_config(layer_enable: u8, activation: Activation, pool: PoolType) -> u32 {
    let mut value = layer_enable as u32 & config::LAYER_EN_MASK;
    value |= (activation.code() << config::ACT_SHIFT) & config::ACT_MASK;
    if let PoolType::Avg = pool {
        value |= config::POOL_AVG;
    }
    value
}

/// Split a CONFIG register value back into its fields.
///
/// Returns `None` when the activation field holds the reserved code.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn unpack_config(value: u32) -> Option<(u8, Activation, PoolType)> {
    let layers = (value & config::LAYER_EN_MASK) as u8;
    let Some(activation) = Activation::from_code((value & config::ACT_MASK) >> config::ACT_SHIFT)
    else {
        return None;
    };
    let pool = if value & config::POOL_AVG != 0 {
        PoolType::Avg
    } else {
        PoolType::Max
    };
    Some((layers, activation, pool))
}

/// Pack the INPUT_DIM register: height in the high half, width in the low.
#[must_use]
pub const fn pack_input_dim(width: u16, height: u16) -> u32 {
    ((height as u32) << 16) | width as u32
}

/// Split an INPUT_DIM register value into `(width, height)`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn unpack_input_dim(value: u32) -> (u16, u16) {
    ((value & 0xFFFF) as u16, (value >> 16) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_codes_round_trip() {
        for act in Activation::ALL {
            assert_eq!(Activation::from_code(act.code()), Some(act));
        }
        assert_eq!(Activation::from_code(7), None);
    }

    #[test]
    fn config_packing_matches_register_layout() {
        assert_eq!(pack_config(0xFF, Activation::Relu, PoolType::Max), 0x0000_01FF);
        assert_eq!(pack_config(0x0F, Activation::Swish, PoolType::Avg), 0x0000_0E0F);
        assert_eq!(pack_config(0x00, Activation::None, PoolType::Max), 0);
        assert_eq!(
            unpack_config(0x0000_0E0F),
            Some((0x0F, Activation::Swish, PoolType::Avg))
        );
        assert_eq!(unpack_config(0x0000_0700), None);
    }

    #[test]
    fn input_dim_puts_height_high() {
        assert_eq!(pack_input_dim(128, 96), 0x0060_0080);
        assert_eq!(unpack_input_dim(0x0060_0080), (128, 96));
    }
}
