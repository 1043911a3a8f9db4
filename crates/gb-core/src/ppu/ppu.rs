use super::fetcher::{bg_tile_data_addr, decode_row, merge_object_pixels, obj_tile_data_addr, tile_id_at, tile_map_base};
use super::fifo::{Pixel, PixelFifo};
use super::object::{ObjectEntry, SelectedObjects};
use super::{Framebuffer, DMG_SHADES, FRAMEBUFFER_LEN, LCD_HEIGHT, LCD_WIDTH};
use crate::interrupt::Interrupt;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Clone, Copy)]
    struct Lcdc: u8 {
        const BG_WINDOW_ENABLE = 0x01;
        const OBJ_ENABLE       = 0x02;
        const OBJ_SIZE         = 0x04;
        const BG_TILE_MAP      = 0x08;
        const TILE_DATA_SELECT = 0x10;
        const WINDOW_ENABLE    = 0x20;
        const WINDOW_TILE_MAP  = 0x40;
        const LCD_ENABLE       = 0x80;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    OamScan,
    Drawing,
    HBlank,
    VBlank,
}

impl Mode {
    fn stat_bits(self) -> u8 {
        match self {
            Mode::HBlank => 0,
            Mode::VBlank => 1,
            Mode::OamScan => 2,
            Mode::Drawing => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FetchStep {
    GetTile,
    GetDataLow,
    GetDataHigh,
    Push,
}

#[derive(Serialize, Deserialize)]
struct ObjFetch {
    entry: ObjectEntry,
    step: FetchStep,
    sub_dot: u8,
    tile_low: u8,
}

fn default_framebuffer() -> Box<Framebuffer> {
    Box::new([0; FRAMEBUFFER_LEN])
}

/// Dot-by-dot mode FSM, OAM scan, background/window/object fetchers, the
/// two pixel FIFOs and the LCD shifter. Register bytes (LCDC, STAT, SCX,
/// SCY, LY, LYC, WY, WX, BGP, OBP0, OBP1) are not duplicated here: they
/// live in the bus's shared `io` array and are passed in by reference each
/// tick, so the two frontends that already peek at `bus.io[...]` directly
/// keep working unmodified.
#[derive(Serialize, Deserialize)]
pub struct Ppu {
    mode: Mode,
    dot: u16,
    lcd_x: u8,
    scx_discard: u8,

    bg_fifo: PixelFifo,
    obj_fifo_colors: [Pixel; 8],
    obj_fifo_filled: bool,

    fetch_step: FetchStep,
    fetch_sub_dot: u8,
    fetch_x: u8,
    tile_id: u8,
    tile_low: u8,
    tile_high: u8,
    first_fetch_of_scanline: bool,
    fetching_window: bool,

    obj_fetch: Option<ObjFetch>,
    selected: SelectedObjects,
    next_object: usize,

    window_line_counter: u16,
    below_window_top: bool,

    stat_line_prev: bool,

    #[serde(skip, default = "default_framebuffer")]
    framebuffer: Box<Framebuffer>,
    frame_ready: bool,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            mode: Mode::OamScan,
            dot: 0,
            lcd_x: 0,
            scx_discard: 0,
            bg_fifo: PixelFifo::new(),
            obj_fifo_colors: [Pixel::default(); 8],
            obj_fifo_filled: false,
            fetch_step: FetchStep::GetTile,
            fetch_sub_dot: 0,
            fetch_x: 0,
            tile_id: 0,
            tile_low: 0,
            tile_high: 0,
            first_fetch_of_scanline: true,
            fetching_window: false,
            obj_fetch: None,
            selected: SelectedObjects::default(),
            next_object: 0,
            window_line_counter: 0,
            below_window_top: false,
            stat_line_prev: false,
            framebuffer: Box::new([0; FRAMEBUFFER_LEN]),
            frame_ready: false,
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn clear_frame_ready(&mut self) {
        self.frame_ready = false;
    }

    pub fn current_mode(&self) -> u8 {
        self.mode.stat_bits()
    }

    /// Writing LY always resets the scanline counter to 0, matching
    /// hardware (LY is not a free-form writable register).
    pub fn reset_ly(&mut self) {
        self.lcd_x = 0;
    }

    fn lcd_enabled(lcdc: u8) -> bool {
        Lcdc::from_bits_truncate(lcdc).contains(Lcdc::LCD_ENABLE)
    }

    fn set_mode(&mut self, mode: Mode, io: &mut [u8; 0x80]) {
        self.mode = mode;
        io[0x41] = (io[0x41] & !0x03) | mode.stat_bits();
    }

    fn stat_line(&self, io: &[u8; 0x80]) -> bool {
        let stat = io[0x41];
        let lyc_eq = io[0x44] == io[0x45];
        let lyc_source = (stat & 0x40) != 0 && lyc_eq;
        let oam_source = (stat & 0x20) != 0 && self.mode == Mode::OamScan;
        let hblank_source = (stat & 0x08) != 0 && self.mode == Mode::HBlank;
        let vblank_source = (stat & 0x10) != 0 && self.mode == Mode::VBlank;
        lyc_source || oam_source || hblank_source || vblank_source
    }

    fn sync_stat_coincidence_and_irq(&mut self, io: &mut [u8; 0x80], iflag: &mut u8) {
        let lyc_eq = io[0x44] == io[0x45];
        if lyc_eq {
            io[0x41] |= 0x04;
        } else {
            io[0x41] &= !0x04;
        }

        let line = self.stat_line(io);
        if line && !self.stat_line_prev {
            *iflag |= Interrupt::LcdStat.bit();
        }
        self.stat_line_prev = line;
    }

    fn start_scanline(&mut self, io: &[u8; 0x80]) {
        self.selected.clear();
        self.next_object = 0;
        self.dot = 0;
        if io[0x44] == io[0x4A] {
            self.below_window_top = true;
        }
    }

    fn start_drawing(&mut self, io: &[u8; 0x80]) {
        self.lcd_x = 0;
        self.scx_discard = io[0x43] & 0x07;
        self.bg_fifo.clear();
        self.obj_fifo_filled = false;
        self.obj_fifo_colors = [Pixel::default(); 8];
        self.fetch_step = FetchStep::GetTile;
        self.fetch_sub_dot = 0;
        self.fetch_x = 0;
        self.first_fetch_of_scanline = true;
        self.fetching_window = false;
        self.obj_fetch = None;
        self.next_object = 0;
    }

    pub fn tick(
        &mut self,
        cycles: u32,
        vram: &[u8; 0x2000],
        oam: &[u8; 0xA0],
        io: &mut [u8; 0x80],
        iflag: &mut u8,
    ) {
        if !Self::lcd_enabled(io[0x40]) {
            io[0x44] = 0;
            self.set_mode(Mode::HBlank, io);
            self.dot = 0;
            self.lcd_x = 0;
            self.stat_line_prev = false;
            return;
        }

        for _ in 0..cycles {
            self.tick_one_dot(vram, oam, io, iflag);
        }
    }

    fn tick_one_dot(
        &mut self,
        vram: &[u8; 0x2000],
        oam: &[u8; 0xA0],
        io: &mut [u8; 0x80],
        iflag: &mut u8,
    ) {
        match self.mode {
            Mode::OamScan => {
                // One entry examined every even dot; 80 dots scan all 40 entries.
                if self.dot % 2 == 0 {
                    let index = (self.dot / 2) as usize;
                    let lcdc = Lcdc::from_bits_truncate(io[0x40]);
                    let tall = lcdc.contains(Lcdc::OBJ_SIZE);
                    self.selected.consider(oam, index, io[0x44], tall);
                }
                self.dot += 1;
                if self.dot == 80 {
                    self.start_drawing(io);
                    self.set_mode(Mode::Drawing, io);
                }
            }
            Mode::Drawing => {
                self.tick_drawing(vram, io);
                self.dot += 1;
            }
            Mode::HBlank => {
                self.dot += 1;
                if self.dot == 456 {
                    io[0x44] += 1;
                    if io[0x44] == 144 {
                        self.set_mode(Mode::VBlank, io);
                        *iflag |= Interrupt::VBlank.bit();
                        self.frame_ready = true;
                    } else {
                        self.start_scanline(io);
                        self.set_mode(Mode::OamScan, io);
                    }
                }
            }
            Mode::VBlank => {
                self.dot += 1;
                if self.dot == 456 {
                    self.dot = 0;
                    io[0x44] += 1;
                    if io[0x44] == 154 {
                        io[0x44] = 0;
                        self.below_window_top = io[0x44] == io[0x4A];
                        self.window_line_counter = 0;
                        self.set_mode(Mode::OamScan, io);
                        self.next_object = 0;
                        self.selected.clear();
                    }
                }
            }
        }

        self.sync_stat_coincidence_and_irq(io, iflag);
    }

    fn window_visible(&self, io: &[u8; 0x80]) -> bool {
        let lcdc = Lcdc::from_bits_truncate(io[0x40]);
        lcdc.contains(Lcdc::WINDOW_ENABLE) && self.below_window_top
    }

    fn maybe_activate_window(&mut self, io: &[u8; 0x80]) {
        if self.fetching_window {
            return;
        }
        if !self.window_visible(io) {
            return;
        }
        let wx = io[0x4B];
        if (self.lcd_x as i32 + 7) < wx as i32 {
            return;
        }
        self.bg_fifo.clear();
        self.fetch_step = FetchStep::GetTile;
        self.fetch_sub_dot = 0;
        self.fetch_x = 0;
        self.fetching_window = true;
    }

    fn maybe_start_object_fetch(&mut self, io: &[u8; 0x80]) {
        if self.obj_fetch.is_some() {
            return;
        }
        let lcdc = Lcdc::from_bits_truncate(io[0x40]);
        if !lcdc.contains(Lcdc::OBJ_ENABLE) {
            return;
        }
        let Some(&entry) = self.selected.as_slice().get(self.next_object) else {
            return;
        };
        if entry.x as i32 > self.lcd_x as i32 + 8 {
            return;
        }
        self.next_object += 1;
        self.obj_fetch = Some(ObjFetch {
            entry,
            step: FetchStep::GetTile,
            sub_dot: 0,
            tile_low: 0,
        });
    }

    fn step_object_fetch(&mut self, vram: &[u8; 0x2000], io: &[u8; 0x80]) {
        let lcdc = Lcdc::from_bits_truncate(io[0x40]);
        let tall = lcdc.contains(Lcdc::OBJ_SIZE);
        let height: i32 = if tall { 16 } else { 8 };
        let ly = io[0x44] as i32;

        let (entry, row_in_tile, tile_index, advance) = {
            let obj = self.obj_fetch.as_mut().expect("object fetch active");
            let top = obj.entry.y as i32 - 16;
            let mut row = ly - top;
            if obj.entry.y_flip() {
                row = height - 1 - row;
            }
            let tile_index = if tall {
                if row < 8 {
                    obj.entry.tile_index & 0xFE
                } else {
                    obj.entry.tile_index | 0x01
                }
            } else {
                obj.entry.tile_index
            };
            let row_in_tile = (row.rem_euclid(8)) as u8;

            obj.sub_dot += 1;
            let advance = obj.sub_dot >= 2;
            if advance {
                obj.sub_dot = 0;
            }
            (obj.entry, row_in_tile, tile_index, advance)
        };

        if !advance {
            return;
        }

        let obj = self.obj_fetch.as_mut().expect("object fetch active");
        match obj.step {
            FetchStep::GetTile => {
                obj.step = FetchStep::GetDataLow;
            }
            FetchStep::GetDataLow => {
                let addr = obj_tile_data_addr(tile_index, row_in_tile) as usize;
                obj.tile_low = vram[addr];
                obj.step = FetchStep::GetDataHigh;
            }
            FetchStep::GetDataHigh => {
                let addr = obj_tile_data_addr(tile_index, row_in_tile) as usize;
                let tile_high = vram[addr + 1];
                let mut colors = decode_row(obj.tile_low, tile_high);
                if entry.x_flip() {
                    colors.reverse();
                }

                let mut pixels = [Pixel::default(); 8];
                for (i, &c) in colors.iter().enumerate() {
                    pixels[i] = Pixel {
                        color: c,
                        palette: entry.palette1() as u8,
                        bg_priority: entry.priority(),
                    };
                }

                let screen_x = entry.x as i32 - 8;
                if screen_x < 0 {
                    let trim = (-screen_x) as usize;
                    let mut shifted = [Pixel::default(); 8];
                    for i in 0..(8 - trim) {
                        shifted[i] = pixels[i + trim];
                    }
                    pixels = shifted;
                }

                if !self.obj_fifo_filled {
                    self.obj_fifo_colors = pixels;
                    self.obj_fifo_filled = true;
                } else {
                    merge_object_pixels(&mut self.obj_fifo_colors, &pixels);
                }

                self.obj_fetch = None;
            }
            FetchStep::Push => unreachable!("object fetch never reaches the push step"),
        }
    }

    fn step_bg_fetch(&mut self, vram: &[u8; 0x2000], io: &[u8; 0x80]) {
        let lcdc = io[0x40];

        match self.fetch_step {
            FetchStep::GetTile => {
                self.fetch_sub_dot += 1;
                if self.fetch_sub_dot < 2 {
                    return;
                }
                self.fetch_sub_dot = 0;

                self.tile_id = if self.fetching_window {
                    let base = tile_map_base(lcdc, 0x40);
                    let row = (self.window_line_counter / 8) as u8;
                    tile_id_at(vram, base, self.fetch_x, row)
                } else {
                    let base = tile_map_base(lcdc, 0x08);
                    let scx = io[0x43];
                    let scy = io[0x42];
                    let col = (scx / 8).wrapping_add(self.fetch_x) & 0x1F;
                    let row = scy.wrapping_add(io[0x44]) / 8;
                    tile_id_at(vram, base, col, row)
                };
                self.fetch_step = FetchStep::GetDataLow;
            }
            FetchStep::GetDataLow => {
                self.fetch_sub_dot += 1;
                if self.fetch_sub_dot < 2 {
                    return;
                }
                self.fetch_sub_dot = 0;
                let row_in_tile = self.bg_row_in_tile(io);
                let addr = bg_tile_data_addr(lcdc, self.tile_id, row_in_tile) as usize;
                self.tile_low = vram[addr];
                self.fetch_step = FetchStep::GetDataHigh;
            }
            FetchStep::GetDataHigh => {
                self.fetch_sub_dot += 1;
                if self.fetch_sub_dot < 2 {
                    return;
                }
                self.fetch_sub_dot = 0;
                let row_in_tile = self.bg_row_in_tile(io);
                let addr = bg_tile_data_addr(lcdc, self.tile_id, row_in_tile) as usize;
                self.tile_high = vram[addr + 1];

                if self.first_fetch_of_scanline {
                    self.first_fetch_of_scanline = false;
                    self.fetch_step = FetchStep::GetTile;
                } else {
                    self.fetch_step = FetchStep::Push;
                }
            }
            FetchStep::Push => {
                if self.bg_fifo.is_empty() {
                    let colors = decode_row(self.tile_low, self.tile_high);
                    for c in colors {
                        self.bg_fifo.push(Pixel {
                            color: c,
                            palette: 0,
                            bg_priority: false,
                        });
                    }
                    self.fetch_x = self.fetch_x.wrapping_add(1);
                    self.fetch_step = FetchStep::GetTile;
                }
            }
        }
    }

    fn bg_row_in_tile(&self, io: &[u8; 0x80]) -> u8 {
        if self.fetching_window {
            (self.window_line_counter % 8) as u8
        } else {
            io[0x42].wrapping_add(io[0x44]) % 8
        }
    }

    fn tick_drawing(&mut self, vram: &[u8; 0x2000], io: &mut [u8; 0x80]) {
        self.maybe_activate_window(io);
        self.maybe_start_object_fetch(io);

        if self.obj_fetch.is_some() {
            self.step_object_fetch(vram, io);
            return;
        }

        self.step_bg_fetch(vram, io);

        if self.bg_fifo.is_empty() {
            return;
        }

        if self.scx_discard > 0 {
            self.bg_fifo.pop();
            self.scx_discard -= 1;
            return;
        }

        let bg_pixel = self.bg_fifo.pop().unwrap();
        let (obj_color, obj_palette, obj_bg_priority) = if self.obj_fifo_filled {
            let p = self.obj_fifo_colors[0];
            for i in 0..7 {
                self.obj_fifo_colors[i] = self.obj_fifo_colors[i + 1];
            }
            self.obj_fifo_colors[7] = Pixel::default();
            (p.color, p.palette, p.bg_priority)
        } else {
            (0, 0, false)
        };

        let lcdc = Lcdc::from_bits_truncate(io[0x40]);
        let bg_color = if lcdc.contains(Lcdc::BG_WINDOW_ENABLE) {
            bg_pixel.color
        } else {
            0
        };
        let obj_color = if lcdc.contains(Lcdc::OBJ_ENABLE) {
            obj_color
        } else {
            0
        };

        let use_object = obj_color != 0 && (!obj_bg_priority || bg_color == 0);
        let shade = if use_object {
            let palette = if obj_palette == 1 { io[0x49] } else { io[0x48] };
            palette_shade(palette, obj_color)
        } else {
            palette_shade(io[0x47], bg_color)
        };

        let y = io[0x44] as usize;
        if y < LCD_HEIGHT && (self.lcd_x as usize) < LCD_WIDTH {
            self.framebuffer[y * LCD_WIDTH + self.lcd_x as usize] = shade;
        }

        self.lcd_x += 1;
        if self.lcd_x == LCD_WIDTH as u8 {
            if self.fetching_window {
                self.window_line_counter += 1;
            }
            self.set_mode(Mode::HBlank, io);
        }
    }
}

fn palette_shade(palette: u8, color: u8) -> u32 {
    let shade = (palette >> (color * 2)) & 0x03;
    DMG_SHADES[shade as usize]
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_with_lcd_on() -> [u8; 0x80] {
        let mut io = [0u8; 0x80];
        io[0x40] = 0x91; // LCD on, BG on, BG tile data at 0x8000, BG map at 0x9800
        io
    }

    #[test]
    fn ppu_disabled_forces_ly0_and_hblank_mode() {
        let mut ppu = Ppu::new();
        let vram = [0u8; 0x2000];
        let oam = [0u8; 0xA0];
        let mut io = [0u8; 0x80]; // LCDC bit7 clear => disabled
        let mut iflag = 0u8;
        ppu.tick(10, &vram, &oam, &mut io, &mut iflag);
        assert_eq!(io[0x44], 0);
        assert_eq!(ppu.current_mode(), 0);
    }

    #[test]
    fn oam_scan_lasts_exactly_80_dots() {
        let mut ppu = Ppu::new();
        let vram = [0u8; 0x2000];
        let oam = [0u8; 0xA0];
        let mut io = io_with_lcd_on();
        let mut iflag = 0u8;
        ppu.tick(79, &vram, &oam, &mut io, &mut iflag);
        assert_eq!(ppu.current_mode(), 2);
        ppu.tick(1, &vram, &oam, &mut io, &mut iflag);
        assert_eq!(ppu.current_mode(), 3);
    }

    #[test]
    fn full_scanline_reaches_hblank_and_increments_ly() {
        let mut ppu = Ppu::new();
        let vram = [0u8; 0x2000];
        let oam = [0u8; 0xA0];
        let mut io = io_with_lcd_on();
        let mut iflag = 0u8;
        ppu.tick(456, &vram, &oam, &mut io, &mut iflag);
        assert_eq!(io[0x44], 1);
    }

    #[test]
    fn enters_vblank_after_144_scanlines_and_requests_interrupt() {
        let mut ppu = Ppu::new();
        let vram = [0u8; 0x2000];
        let oam = [0u8; 0xA0];
        let mut io = io_with_lcd_on();
        let mut iflag = 0u8;
        ppu.tick(456 * 144, &vram, &oam, &mut io, &mut iflag);
        assert_eq!(ppu.current_mode(), 1);
        assert_ne!(iflag & Interrupt::VBlank.bit(), 0);
        assert!(ppu.frame_ready());
    }

    #[test]
    fn lyc_rising_edge_requests_stat_interrupt_exactly_once_per_match() {
        let mut ppu = Ppu::new();
        let vram = [0u8; 0x2000];
        let oam = [0u8; 0xA0];
        let mut io = io_with_lcd_on();
        io[0x41] = 0x40; // enable only the LYC==LY STAT source
        io[0x45] = 1; // LYC = 1
        let mut iflag = 0u8;

        let mut stat_interrupts = 0u32;
        for _ in 0..(456 * 3) {
            ppu.tick(1, &vram, &oam, &mut io, &mut iflag);
            if iflag & Interrupt::LcdStat.bit() != 0 {
                stat_interrupts += 1;
                iflag &= !Interrupt::LcdStat.bit();
            }
        }
        assert_eq!(stat_interrupts, 1);
    }
}
