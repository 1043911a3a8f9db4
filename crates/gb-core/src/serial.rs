use crate::interrupt::Interrupt;
use serde::{Deserialize, Serialize};

/// Bit clocks per shifted bit for the internal ("master") clock source,
/// 4_194_304 Hz / 8192 Hz.
const CYCLES_PER_BIT: u16 = 512;

/// SB/SC link-cable shift register. With no link partner modeled, an
/// internal-clock transfer always completes on its own (shifting in 1s);
/// an external-clock transfer is accepted but never completes.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Serial {
    sb: u8,
    active: bool,
    internal_clock: bool,
    bits_remaining: u8,
    bit_timer: u16,
    #[serde(skip)]
    output: Vec<u8>,
}

impl Serial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_sb(&self) -> u8 {
        self.sb
    }

    pub fn write_sb(&mut self, val: u8) {
        self.sb = val;
    }

    pub fn read_sc(&self) -> u8 {
        let active = if self.active { 0x80 } else { 0x00 };
        let clock = if self.internal_clock { 0x01 } else { 0x00 };
        0x7E | active | clock
    }

    pub fn write_sc(&mut self, val: u8) {
        self.internal_clock = (val & 0x01) != 0;
        if (val & 0x80) != 0 {
            self.active = true;
            self.bits_remaining = 8;
            self.bit_timer = CYCLES_PER_BIT;
        } else {
            self.active = false;
        }
    }

    pub fn tick(&mut self, cycles: u32, iflag: &mut u8) {
        if !self.active || !self.internal_clock {
            return;
        }

        let mut remaining = cycles;
        while remaining > 0 {
            let step = remaining.min(self.bit_timer as u32);
            self.bit_timer -= step as u16;
            remaining -= step;

            if self.bit_timer == 0 {
                // No link partner: the incoming bit reads as the idle-high line.
                self.sb = (self.sb << 1) | 0x01;
                self.bits_remaining -= 1;
                self.bit_timer = CYCLES_PER_BIT;

                if self.bits_remaining == 0 {
                    self.active = false;
                    self.output.push(self.sb);
                    *iflag |= Interrupt::Serial.bit();
                    break;
                }
            }
        }
    }

    pub fn drain_output(&mut self) -> std::vec::Drain<'_, u8> {
        self.output.drain(..)
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}
