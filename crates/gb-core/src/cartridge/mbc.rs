use crate::cartridge::{mbc0::Mbc0, mbc1::Mbc1, mbc2::Mbc2, mbc3::Mbc3, mbc5::Mbc5};
use serde::{Deserialize, Serialize};

pub trait Mbc {
    fn read_rom(&self, rom: &[u8], addr: u16) -> u8;
    fn write_rom(&mut self, addr: u16, val: u8);
    fn read_ram(&self, ram: &[u8], addr: u16) -> u8;
    fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8);

    fn tick(&mut self, _cycles: u32) {}

    fn save_extra(&self) -> Vec<u8> {
        Vec::new()
    }

    fn load_extra(&mut self, data: &[u8]) -> Result<(), &'static str> {
        if data.is_empty() {
            Ok(())
        } else {
            Err("unexpected mapper save data")
        }
    }
}

/// Concrete mapper dispatch. An enum rather than `Box<dyn Mbc>` so the
/// cartridge state stays plain-old-data and derives `Serialize`/`Deserialize`
/// for save states without any trait-object plumbing.
#[derive(Serialize, Deserialize)]
pub enum MbcEnum {
    Mbc0(Mbc0),
    Mbc1(Mbc1),
    Mbc2(Mbc2),
    Mbc3(Mbc3),
    Mbc5(Mbc5),
}

impl Mbc for MbcEnum {
    fn read_rom(&self, rom: &[u8], addr: u16) -> u8 {
        match self {
            MbcEnum::Mbc0(m) => m.read_rom(rom, addr),
            MbcEnum::Mbc1(m) => m.read_rom(rom, addr),
            MbcEnum::Mbc2(m) => m.read_rom(rom, addr),
            MbcEnum::Mbc3(m) => m.read_rom(rom, addr),
            MbcEnum::Mbc5(m) => m.read_rom(rom, addr),
        }
    }

    fn write_rom(&mut self, addr: u16, val: u8) {
        match self {
            MbcEnum::Mbc0(m) => m.write_rom(addr, val),
            MbcEnum::Mbc1(m) => m.write_rom(addr, val),
            MbcEnum::Mbc2(m) => m.write_rom(addr, val),
            MbcEnum::Mbc3(m) => m.write_rom(addr, val),
            MbcEnum::Mbc5(m) => m.write_rom(addr, val),
        }
    }

    fn read_ram(&self, ram: &[u8], addr: u16) -> u8 {
        match self {
            MbcEnum::Mbc0(m) => m.read_ram(ram, addr),
            MbcEnum::Mbc1(m) => m.read_ram(ram, addr),
            MbcEnum::Mbc2(m) => m.read_ram(ram, addr),
            MbcEnum::Mbc3(m) => m.read_ram(ram, addr),
            MbcEnum::Mbc5(m) => m.read_ram(ram, addr),
        }
    }

    fn write_ram(&mut self, ram: &mut [u8], addr: u16, val: u8) {
        match self {
            MbcEnum::Mbc0(m) => m.write_ram(ram, addr, val),
            MbcEnum::Mbc1(m) => m.write_ram(ram, addr, val),
            MbcEnum::Mbc2(m) => m.write_ram(ram, addr, val),
            MbcEnum::Mbc3(m) => m.write_ram(ram, addr, val),
            MbcEnum::Mbc5(m) => m.write_ram(ram, addr, val),
        }
    }

    fn tick(&mut self, cycles: u32) {
        match self {
            MbcEnum::Mbc0(m) => m.tick(cycles),
            MbcEnum::Mbc1(m) => m.tick(cycles),
            MbcEnum::Mbc2(m) => m.tick(cycles),
            MbcEnum::Mbc3(m) => m.tick(cycles),
            MbcEnum::Mbc5(m) => m.tick(cycles),
        }
    }

    fn save_extra(&self) -> Vec<u8> {
        match self {
            MbcEnum::Mbc0(m) => m.save_extra(),
            MbcEnum::Mbc1(m) => m.save_extra(),
            MbcEnum::Mbc2(m) => m.save_extra(),
            MbcEnum::Mbc3(m) => m.save_extra(),
            MbcEnum::Mbc5(m) => m.save_extra(),
        }
    }

    fn load_extra(&mut self, data: &[u8]) -> Result<(), &'static str> {
        match self {
            MbcEnum::Mbc0(m) => m.load_extra(data),
            MbcEnum::Mbc1(m) => m.load_extra(data),
            MbcEnum::Mbc2(m) => m.load_extra(data),
            MbcEnum::Mbc3(m) => m.load_extra(data),
            MbcEnum::Mbc5(m) => m.load_extra(data),
        }
    }
}
