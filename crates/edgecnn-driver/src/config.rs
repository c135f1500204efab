//! Accelerator and platform configuration
//!
//! [`AcceleratorConfig`] describes the network the bitstream should run and
//! is replaced wholesale on every `configure`. [`PlatformConfig`] holds the
//! board-specific addresses: where the IP block and its DMA engines sit on
//! the AXI bus and where the DDR buffers live.

use crate::error::{AccelError, Result};
use edgecnn_chip::fields::{self, ALL_LAYERS, MAX_CLASSES, MAX_INPUT_DIM};
use edgecnn_chip::memmap;
use edgecnn_chip::{Activation, PoolType};

/// Network configuration programmed into CONFIG and INPUT_DIM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceleratorConfig {
    /// Input width in pixels, `1..=224`
    pub input_width: u16,
    /// Input height in pixels, `1..=224`
    pub input_height: u16,
    /// Input channels
    pub input_channels: u8,
    /// Output classes, `1..=100`
    pub num_classes: u8,
    /// One enable bit per hardware layer
    pub layer_enable: u8,
    /// Activation after each convolution
    pub activation: Activation,
    /// Pooling between layers
    pub pool_type: PoolType,
}

impl Default for AcceleratorConfig {
    /// 128×128 RGB, 10 classes, every layer, ReLU, max pooling.
    fn default() -> Self {
        Self {
            input_width: 128,
            input_height: 128,
            input_channels: 3,
            num_classes: 10,
            layer_enable: ALL_LAYERS,
            activation: Activation::Relu,
            pool_type: PoolType::Max,
        }
    }
}

impl AcceleratorConfig {
    /// Set input dimensions.
    #[must_use]
    pub const fn with_input(mut self, width: u16, height: u16, channels: u8) -> Self {
        self.input_width = width;
        self.input_height = height;
        self.input_channels = channels;
        self
    }

    /// Set the number of classes.
    #[must_use]
    pub const fn with_classes(mut self, num_classes: u8) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// Set the layer enable mask.
    #[must_use]
    pub const fn with_layers(mut self, layer_enable: u8) -> Self {
        self.layer_enable = layer_enable;
        self
    }

    /// Set the activation function.
    #[must_use]
    pub const fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Set the pooling type.
    #[must_use]
    pub const fn with_pooling(mut self, pool_type: PoolType) -> Self {
        self.pool_type = pool_type;
        self
    }

    /// Check ranges. Out-of-range values are rejected, never clamped.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.input_width == 0 || self.input_width > MAX_INPUT_DIM {
            return Err(AccelError::invalid_config(format!(
                "input width {} outside 1..={MAX_INPUT_DIM}",
                self.input_width
            )));
        }
        if self.input_height == 0 || self.input_height > MAX_INPUT_DIM {
            return Err(AccelError::invalid_config(format!(
                "input height {} outside 1..={MAX_INPUT_DIM}",
                self.input_height
            )));
        }
        if self.input_channels == 0 {
            return Err(AccelError::invalid_config("input channels must be non-zero"));
        }
        if self.num_classes == 0 || self.num_classes > MAX_CLASSES {
            return Err(AccelError::invalid_config(format!(
                "class count {} outside 1..={MAX_CLASSES}",
                self.num_classes
            )));
        }
        Ok(())
    }

    /// CONFIG register value.
    pub const fn config_register(&self) -> u32 {
        fields::pack_config(self.layer_enable, self.activation, self.pool_type)
    }

    /// INPUT_DIM register value.
    pub const fn input_dim_register(&self) -> u32 {
        fields::pack_input_dim(self.input_width, self.input_height)
    }

    /// Elements in one input frame.
    pub const fn frame_elements(&self) -> usize {
        self.input_width as usize * self.input_height as usize * self.input_channels as usize
    }

    /// Bytes in one input frame.
    pub const fn frame_bytes(&self) -> usize {
        self.frame_elements() * memmap::ELEMENT_BYTES
    }

    /// Bytes in the logit buffer.
    pub const fn output_bytes(&self) -> usize {
        self.num_classes as usize * memmap::ELEMENT_BYTES
    }
}

/// DDR buffers shared with the accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegions {
    /// Weight buffer
    pub weights: u32,
    /// Bias buffer
    pub biases: u32,
    /// Input frame buffer
    pub input: u32,
    /// Output logit buffer
    pub output: u32,
}

impl Default for MemoryRegions {
    fn default() -> Self {
        Self {
            weights: memmap::WEIGHT_MEM,
            biases: memmap::BIAS_MEM,
            input: memmap::INPUT_MEM,
            output: memmap::OUTPUT_MEM,
        }
    }
}

impl MemoryRegions {
    /// Regions in register order: weights, biases, input, output.
    pub const fn as_array(&self) -> [u32; 4] {
        [self.weights, self.biases, self.input, self.output]
    }
}

/// Board-level addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Accelerator register base
    pub register_base: u32,
    /// Video DMA engine base
    pub dma_video_base: u32,
    /// Weights DMA engine base
    pub dma_weights_base: u32,
    /// DDR buffers
    pub regions: MemoryRegions,
    /// Bytes mapped per DDR buffer
    pub region_size: usize,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            register_base: memmap::ACCEL_BASE,
            dma_video_base: memmap::DMA_VIDEO_BASE,
            dma_weights_base: memmap::DMA_WEIGHTS_BASE,
            regions: MemoryRegions::default(),
            region_size: memmap::MAX_FRAME_BYTES.next_power_of_two(),
        }
    }
}

impl PlatformConfig {
    /// Defaults overridden by `EDGECNN_*` environment variables.
    ///
    /// Recognised: `EDGECNN_REG_BASE`, `EDGECNN_DMA_VIDEO_BASE`,
    /// `EDGECNN_DMA_WEIGHTS_BASE`, `EDGECNN_WEIGHT_MEM`, `EDGECNN_BIAS_MEM`,
    /// `EDGECNN_INPUT_MEM`, `EDGECNN_OUTPUT_MEM`, `EDGECNN_REGION_SIZE`.
    /// Values are decimal or `0x`-prefixed hex.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    ///
    /// # Errors
    ///
    /// Returns an error if a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        let fields: [(&str, &mut u32); 7] = [
            ("EDGECNN_REG_BASE", &mut cfg.register_base),
            ("EDGECNN_DMA_VIDEO_BASE", &mut cfg.dma_video_base),
            ("EDGECNN_DMA_WEIGHTS_BASE", &mut cfg.dma_weights_base),
            ("EDGECNN_WEIGHT_MEM", &mut cfg.regions.weights),
            ("EDGECNN_BIAS_MEM", &mut cfg.regions.biases),
            ("EDGECNN_INPUT_MEM", &mut cfg.regions.input),
            ("EDGECNN_OUTPUT_MEM", &mut cfg.regions.output),
        ];
        for (key, slot) in fields {
            if let Some(raw) = lookup(key) {
                let value = parse_number(&raw)
                    .ok_or_else(|| AccelError::invalid_config(format!("{key}={raw:?}")))?;
                *slot = u32::try_from(value).map_err(|_| {
                    AccelError::invalid_config(format!("{key}={raw:?} exceeds 32 bits"))
                })?;
            }
        }
        if let Some(raw) = lookup("EDGECNN_REGION_SIZE") {
            let value = parse_number(&raw).ok_or_else(|| {
                AccelError::invalid_config(format!("EDGECNN_REGION_SIZE={raw:?}"))
            })?;
            cfg.region_size = usize::try_from(value).map_err(|_| {
                AccelError::invalid_config(format!("EDGECNN_REGION_SIZE={raw:?} too large"))
            })?;
        }
        tracing::debug!("platform config: {cfg:x?}");
        Ok(cfg)
    }
}

/// Parse decimal or `0x`-prefixed hex, allowing `_` separators.
pub fn parse_number(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|&c| c != '_').collect();
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        cleaned.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_matches_boot_configuration() {
        let cfg = AcceleratorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.config_register(), 0x1FF);
        assert_eq!(cfg.input_dim_register(), (128 << 16) | 128);
        assert_eq!(cfg.frame_bytes(), 128 * 128 * 3 * 2);
        assert_eq!(cfg.output_bytes(), 20);
    }

    #[test]
    fn dimensions_are_rejected_not_clamped() {
        let base = AcceleratorConfig::default();
        assert!(base.with_input(0, 128, 3).validate().is_err());
        assert!(base.with_input(128, 225, 3).validate().is_err());
        assert!(base.with_input(224, 224, 3).validate().is_ok());
        assert!(base.with_input(1, 1, 1).validate().is_ok());
        assert!(base.with_input(128, 128, 0).validate().is_err());
        assert!(base.with_classes(0).validate().is_err());
        assert!(base.with_classes(101).validate().is_err());
        assert!(base.with_classes(100).validate().is_ok());
    }

    #[test]
    fn platform_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("EDGECNN_REG_BASE", "0xA000_0000"),
            ("EDGECNN_OUTPUT_MEM", "671088640"),
            ("EDGECNN_REGION_SIZE", "0x10000"),
        ]
        .into_iter()
        .collect();
        let cfg = PlatformConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(cfg.register_base, 0xA000_0000);
        assert_eq!(cfg.regions.output, 0x2800_0000);
        assert_eq!(cfg.regions.weights, memmap::WEIGHT_MEM);
        assert_eq!(cfg.region_size, 0x10000);
    }

    #[test]
    fn platform_rejects_garbage() {
        assert!(PlatformConfig::from_lookup(|k| {
            (k == "EDGECNN_BIAS_MEM").then(|| "bias".to_string())
        })
        .is_err());
        assert!(PlatformConfig::from_lookup(|k| {
            (k == "EDGECNN_INPUT_MEM").then(|| "0x1_0000_0000".to_string())
        })
        .is_err());
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("0x2800_0000"), Some(0x2800_0000));
        assert_eq!(parse_number(" 42 "), Some(42));
        assert_eq!(parse_number("0xZZ"), None);
    }
}
