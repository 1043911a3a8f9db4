use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::dma;
use crate::input::Joypad;
use crate::ppu::Ppu;
use crate::serial::Serial;
use crate::timer::Timer;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::path::Path;

#[derive(Serialize, Deserialize)]
pub struct Bus {
    pub cart: Cartridge,
    pub ppu: Ppu,
    pub apu: Apu,
    pub timer: Timer,
    pub input: Joypad,
    pub serial: Serial,
    #[serde(with = "BigArray")]
    pub wram: [u8; 0x2000],
    #[serde(with = "BigArray")]
    pub vram: [u8; 0x2000],
    #[serde(with = "BigArray")]
    pub oam: [u8; 0xA0],
    #[serde(with = "BigArray")]
    pub io: [u8; 0x80],
    #[serde(with = "BigArray")]
    pub hram: [u8; 0x7F],
    pub ie: u8,
    pub iflag: u8,
    pub oam_dma: dma::OamDma,
}

impl Bus {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            cart,
            ppu: Ppu::new(),
            apu: Apu::new(),
            timer: Timer::new(),
            input: Joypad::new(),
            serial: Serial::new(),
            wram: [0; 0x2000],
            vram: [0; 0x2000],
            oam: [0; 0xA0],
            io: [0; 0x80],
            hram: [0; 0x7F],
            ie: 0,
            iflag: 0,
            oam_dma: dma::OamDma::default(),
        }
    }

    fn read_wram(&self, addr: u16) -> u8 {
        // 0xC000-0xDFFF is the live bank; 0xE000-0xFDFF echoes it.
        self.wram[(addr & 0x1FFF) as usize]
    }

    fn write_wram(&mut self, addr: u16, val: u8) {
        self.wram[(addr & 0x1FFF) as usize] = val;
    }

    fn lcd_enabled(&self) -> bool {
        (self.io[0x40] & 0x80) != 0
    }

    fn ppu_mode(&self) -> u8 {
        self.ppu.current_mode()
    }

    fn cpu_access_blocked_by_ppu(&self, addr: u16) -> bool {
        if !self.lcd_enabled() {
            return false;
        }

        let mode = self.ppu_mode();
        match addr {
            // VRAM is inaccessible to the CPU during mode 3.
            0x8000..=0x9FFF => mode == 3,
            // OAM is inaccessible to the CPU during modes 2 and 3.
            0xFE00..=0xFE9F => mode == 2 || mode == 3,
            _ => false,
        }
    }

    pub fn read8(&mut self, addr: u16) -> u8 {
        if self.oam_dma.blocks_cpu_addr(addr) {
            return 0xFF;
        }
        if self.cpu_access_blocked_by_ppu(addr) {
            return 0xFF;
        }
        self.read8_direct(addr)
    }

    fn read8_direct(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.cart.read(addr),
            0x8000..=0x9FFF => self.vram[(addr - 0x8000) as usize],
            0xA000..=0xBFFF => self.cart.read(addr),
            0xC000..=0xDFFF => self.read_wram(addr),
            0xE000..=0xFDFF => self.read_wram(addr),
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize],
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00..=0xFF7F => match addr {
                0xFF00 => self.input.read_joyp(),
                0xFF01 => self.serial.read_sb(),
                0xFF02 => self.serial.read_sc(),
                0xFF04 => self.timer.read_div(),
                0xFF05 => self.timer.read_tima(),
                0xFF06 => self.timer.read_tma(),
                0xFF07 => self.timer.read_tac(),
                0xFF0F => self.iflag | 0xE0,
                0xFF10..=0xFF3F => self.apu.read_register(addr),
                // CGB-only registers: not implemented on this DMG-only core.
                0xFF4D | 0xFF4F | 0xFF51..=0xFF55 | 0xFF68..=0xFF6B | 0xFF70 => 0xFF,
                _ => self.io[(addr - 0xFF00) as usize],
            },
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie,
        }
    }

    pub fn write8(&mut self, addr: u16, val: u8) {
        if self.oam_dma.blocks_cpu_addr(addr) {
            return;
        }
        if self.cpu_access_blocked_by_ppu(addr) {
            return;
        }
        self.write8_direct(addr, val);
    }

    fn write8_direct(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF => self.cart.write(addr, val),
            0x8000..=0x9FFF => self.vram[(addr - 0x8000) as usize] = val,
            0xA000..=0xBFFF => self.cart.write(addr, val),
            0xC000..=0xDFFF => self.write_wram(addr, val),
            0xE000..=0xFDFF => self.write_wram(addr, val),
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize] = val,
            0xFEA0..=0xFEFF => {}
            0xFF00..=0xFF7F => {
                let idx = (addr - 0xFF00) as usize;
                match addr {
                    0xFF00 => self.input.write_joyp(val),
                    0xFF01 => self.serial.write_sb(val),
                    0xFF02 => self.serial.write_sc(val),
                    0xFF04 => self.timer.write_div(),
                    0xFF05 => self.timer.write_tima(val),
                    0xFF06 => self.timer.write_tma(val),
                    0xFF07 => self.timer.write_tac(val),
                    0xFF0F => self.iflag = val & 0x1F,
                    0xFF10..=0xFF3F => self.apu.write_register(addr, val),
                    // CGB-only registers: accepted and ignored.
                    0xFF4D | 0xFF4F | 0xFF51..=0xFF55 | 0xFF68..=0xFF6B | 0xFF70 => {}
                    0xFF41 => self.io[idx] = (self.io[idx] & 0x07) | (val & 0x78),
                    0xFF44 => {
                        self.io[idx] = 0;
                        self.ppu.reset_ly();
                    }
                    0xFF46 => {
                        self.io[idx] = val;
                        self.oam_dma.start(val);
                    }
                    _ => self.io[idx] = val,
                }
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie = val,
        }
    }

    pub fn set_joypad_button(&mut self, button: crate::input::Button, pressed: bool) {
        self.input.set_button(button, pressed, &mut self.iflag);
    }

    /// `cycles` is in T-cycles (one M-cycle = 4 T-cycles); this is the
    /// fixed per-tick order timer -> OAM DMA -> PPU -> serial.
    pub fn tick(&mut self, cycles: u32) {
        self.cart.mbc.tick(cycles);
        self.timer.tick(cycles, &mut self.iflag);
        self.tick_oam_dma(cycles);
        self.ppu
            .tick(cycles, &self.vram, &self.oam, &mut self.io, &mut self.iflag);
        self.apu.tick(cycles);
        self.serial.tick(cycles, &mut self.iflag);
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), crate::cartridge::SaveError> {
        self.cart.save_to_path(path)
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), crate::cartridge::SaveError> {
        self.cart.load_from_path(path)
    }

    fn tick_oam_dma(&mut self, cycles: u32) {
        self.oam_dma.add_cycles(cycles);
        while let Some((src, dst)) = self.oam_dma.pop_transfer() {
            let v = self.read8_direct(src);
            self.oam[dst] = v;
        }
    }
}
