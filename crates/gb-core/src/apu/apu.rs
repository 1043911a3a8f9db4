use serde::{Deserialize, Serialize};

/// Register-only APU shell: FF10-FF26 accept and return the values a real
/// DMG APU would store, NR52's channel-on flags always read back tied to
/// the power bit (this core models no individual channel), and FF30-FF3F
/// (wave RAM) is plain byte storage. No channel is actually synthesized.
#[derive(Serialize, Deserialize)]
pub struct Apu {
    registers: [u8; 0x30],
    enabled: bool,
    #[serde(skip)]
    samples: Vec<f32>,
}

/// Per-register OR-mask of bits that a real DMG APU always reads back as 1
/// (unimplemented/write-only bits), indexed by `addr - 0xFF10`.
const READ_MASK: [u8; 0x30] = {
    let mut mask = [0xFFu8; 0x30];
    mask[0x00] = 0x80; // NR10
    mask[0x01] = 0x3F; // NR11
    mask[0x02] = 0x00; // NR12
    mask[0x04] = 0xBF; // NR14
    mask[0x06] = 0x3F; // NR21
    mask[0x07] = 0x00; // NR22
    mask[0x09] = 0xBF; // NR24
    mask[0x0A] = 0x7F; // NR30
    mask[0x0C] = 0x9F; // NR32
    mask[0x0E] = 0xBF; // NR34
    mask[0x11] = 0x00; // NR42
    mask[0x12] = 0x00; // NR43
    mask[0x13] = 0xBF; // NR44
    mask[0x14] = 0x00; // NR50
    mask[0x15] = 0x00; // NR51
    mask[0x16] = 0x70; // NR52
    let mut i = 0x20;
    while i < 0x30 {
        mask[i] = 0x00; // wave RAM
        i += 1;
    }
    mask
};

impl Apu {
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 48_000;
    pub const DEFAULT_CHANNELS: u8 = 2;

    pub fn new() -> Self {
        Self {
            registers: [0; 0x30],
            enabled: true,
            samples: Vec::new(),
        }
    }

    pub fn read_register(&self, addr: u16) -> u8 {
        match addr {
            0xFF26 => {
                // Bits 0-3 would report each channel's internal enabled
                // flag; with no channel modeled they never set regardless
                // of the power bit.
                let power = if self.enabled { 0x80 } else { 0x00 };
                power | READ_MASK[0x16]
            }
            0xFF27..=0xFF2F => 0xFF,
            0xFF10..=0xFF3F => {
                let idx = (addr - 0xFF10) as usize;
                self.registers[idx] | READ_MASK[idx]
            }
            _ => 0xFF,
        }
    }

    pub fn write_register(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF26 => {
                let was_enabled = self.enabled;
                self.enabled = (val & 0x80) != 0;
                if was_enabled && !self.enabled {
                    // Powering off clears every channel register except wave RAM.
                    for b in &mut self.registers[..0x20] {
                        *b = 0;
                    }
                }
            }
            0xFF27..=0xFF2F => {}
            0xFF30..=0xFF3F => self.registers[(addr - 0xFF10) as usize] = val,
            0xFF10..=0xFF25 => {
                if self.enabled {
                    self.registers[(addr - 0xFF10) as usize] = val;
                }
            }
            _ => {}
        }
    }

    pub fn tick(&mut self, _cycles: u32) {}

    /// Drain all currently-produced interleaved stereo samples. Always
    /// empty: this build carries no channel synthesis.
    pub fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_ram_is_plain_storage() {
        let mut apu = Apu::new();
        apu.write_register(0xFF30, 0xAB);
        assert_eq!(apu.read_register(0xFF30), 0xAB);
    }

    #[test]
    fn powering_off_clears_channel_registers_but_not_wave_ram() {
        let mut apu = Apu::new();
        apu.write_register(0xFF30, 0xCD);
        apu.write_register(0xFF12, 0x77);
        apu.write_register(0xFF26, 0x00);
        assert_eq!(apu.read_register(0xFF12), 0x00); // NR12's mask is 0x00
        assert_eq!(apu.read_register(0xFF30), 0xCD);
        assert_eq!(apu.read_register(0xFF26) & 0x80, 0x00);
    }

    #[test]
    fn writes_to_channel_registers_are_ignored_while_powered_off() {
        let mut apu = Apu::new();
        apu.write_register(0xFF26, 0x00);
        apu.write_register(0xFF12, 0x77);
        assert_eq!(apu.read_register(0xFF12), 0x00);
    }

    #[test]
    fn unimplemented_bits_read_back_as_one() {
        let mut apu = Apu::new();
        apu.write_register(0xFF11, 0x00);
        assert_eq!(apu.read_register(0xFF11), 0x3F);
        assert_eq!(apu.read_register(0xFF27), 0xFF);
    }

    #[test]
    fn nr52_channel_status_bits_never_set_without_channel_synthesis() {
        let mut apu = Apu::new();
        assert_eq!(apu.read_register(0xFF26), 0xF0);
        apu.write_register(0xFF26, 0x00);
        assert_eq!(apu.read_register(0xFF26), 0x70);
    }
}
