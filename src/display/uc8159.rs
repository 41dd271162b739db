//! Driver for the UC8159-based 7-colour Inky Impression panel.
//!
//! Wire protocol only: reset, a fixed init sequence, one full-frame data
//! transmission and a refresh cycle. The panel takes 4-bit palette indices
//! packed two pixels per byte; the canvas is quantized by nearest palette
//! colour (the panel's own colour behaviour is not modelled here).

use std::io::Write;
use std::thread::sleep;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use linux_embedded_hal::gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions};
use tracing::debug;

use super::{DisplayError, Panel};
use crate::config::DisplayConfig;

// BCM pin assignment on the Inky Impression HAT.
const DC_PIN: u32 = 22;
const RESET_PIN: u32 = 27;
const BUSY_PIN: u32 = 17;

// UC8159 command set (the subset this driver uses).
const PSR: u8 = 0x00;
const PWR: u8 = 0x01;
const POF: u8 = 0x02;
const PFS: u8 = 0x03;
const PON: u8 = 0x04;
const BTST: u8 = 0x06;
const DTM1: u8 = 0x10;
const DRF: u8 = 0x12;
const PLL: u8 = 0x30;
const TSE: u8 = 0x41;
const CDI: u8 = 0x50;
const TCON: u8 = 0x60;
const TRES: u8 = 0x61;
const PWS: u8 = 0xE3;

// Linux spidev transfers are capped at one page.
const SPI_CHUNK: usize = 4096;

/// A 7-colour refresh takes roughly 30 seconds.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(40);
const SETUP_TIMEOUT: Duration = Duration::from_secs(1);

/// The panel's 7 colours, index = wire value.
const PALETTE: [[u8; 3]; 7] = [
    [0, 0, 0],       // black
    [255, 255, 255], // white
    [0, 255, 0],     // green
    [0, 0, 255],     // blue
    [255, 0, 0],     // red
    [255, 255, 0],   // yellow
    [255, 140, 0],   // orange
];

pub struct Uc8159 {
    spi: Spidev,
    dc: LineHandle,
    reset: LineHandle,
    busy: LineHandle,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl Uc8159 {
    /// Open SPI and GPIO lines and run the panel init sequence.
    pub fn open(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let mut spi = Spidev::open(&config.spi_device)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(3_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;

        let mut chip = Chip::new(&config.gpio_chip)?;
        let dc = chip
            .get_line(DC_PIN)?
            .request(LineRequestFlags::OUTPUT, 0, "inky-frame-dc")?;
        let reset = chip
            .get_line(RESET_PIN)?
            .request(LineRequestFlags::OUTPUT, 1, "inky-frame-reset")?;
        let busy = chip
            .get_line(BUSY_PIN)?
            .request(LineRequestFlags::INPUT, 0, "inky-frame-busy")?;

        let (width, height) = (config.width, config.height);
        let mut panel = Self {
            spi,
            dc,
            reset,
            busy,
            width,
            height,
            // One nibble per pixel, initialized to white.
            buffer: vec![0x11; (width * height) as usize / 2],
        };
        panel.hard_reset()?;
        panel.init()?;
        Ok(panel)
    }

    fn hard_reset(&mut self) -> Result<(), DisplayError> {
        self.reset.set_value(0)?;
        sleep(Duration::from_millis(100));
        self.reset.set_value(1)?;
        sleep(Duration::from_millis(100));
        self.wait_until_idle(SETUP_TIMEOUT)
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let w = self.width as u16;
        let h = self.height as u16;
        self.command(TRES, &[(w >> 8) as u8, w as u8, (h >> 8) as u8, h as u8])?;
        self.command(PSR, &[0xE3, 0x08])?;
        self.command(PWR, &[0x37, 0x00, 0x23, 0x23])?;
        self.command(PFS, &[0x00])?;
        self.command(BTST, &[0xC7, 0xC7, 0x1D])?;
        self.command(PLL, &[0x3C])?;
        self.command(TSE, &[0x00])?;
        self.command(CDI, &[0x37])?;
        self.command(TCON, &[0x22])?;
        self.command(PWS, &[0xAA])?;
        Ok(())
    }

    /// Send a command byte, then its data bytes.
    fn command(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_value(0)?;
        self.spi.write_all(&[command])?;
        if !data.is_empty() {
            self.data(data)?;
        }
        Ok(())
    }

    fn data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.dc.set_value(1)?;
        for chunk in data.chunks(SPI_CHUNK) {
            self.spi.write_all(chunk)?;
        }
        Ok(())
    }

    /// The busy line is held low while the controller works.
    fn wait_until_idle(&self, timeout: Duration) -> Result<(), DisplayError> {
        let start = Instant::now();
        while self.busy.get_value()? == 0 {
            if start.elapsed() > timeout {
                return Err(DisplayError::BusyTimeout(timeout));
            }
            sleep(Duration::from_millis(10));
        }
        Ok(())
    }
}

impl Panel for Uc8159 {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_image(&mut self, canvas: &RgbImage) -> Result<(), DisplayError> {
        if (canvas.width(), canvas.height()) != (self.width, self.height) {
            return Err(DisplayError::GeometryMismatch {
                want_w: self.width,
                want_h: self.height,
                got_w: canvas.width(),
                got_h: canvas.height(),
            });
        }
        self.buffer = pack_pixels(canvas);
        Ok(())
    }

    fn show(&mut self) -> Result<(), DisplayError> {
        debug!(bytes = self.buffer.len(), "Transmitting frame");
        let frame = std::mem::take(&mut self.buffer);
        let result = (|| {
            self.command(DTM1, &frame)?;
            self.command(PON, &[])?;
            self.wait_until_idle(SETUP_TIMEOUT)?;
            self.command(DRF, &[])?;
            self.wait_until_idle(REFRESH_TIMEOUT)?;
            self.command(POF, &[])?;
            self.wait_until_idle(SETUP_TIMEOUT)
        })();
        self.buffer = frame;
        result
    }
}

/// Quantize a canvas to the panel palette, packing two 4-bit indices per
/// byte (first pixel in the high nibble).
fn pack_pixels(canvas: &RgbImage) -> Vec<u8> {
    let mut packed = Vec::with_capacity(canvas.as_raw().len() / 6);
    let mut pixels = canvas.pixels();
    while let (Some(a), Some(b)) = (pixels.next(), pixels.next()) {
        packed.push((nearest_palette(a) << 4) | nearest_palette(b));
    }
    packed
}

fn nearest_palette(pixel: &Rgb<u8>) -> u8 {
    let mut best = 0u8;
    let mut best_distance = u32::MAX;
    for (index, colour) in PALETTE.iter().enumerate() {
        let distance: u32 = colour
            .iter()
            .zip(pixel.0.iter())
            .map(|(&c, &p)| {
                let d = i32::from(c) - i32::from(p);
                (d * d) as u32
            })
            .sum();
        if distance < best_distance {
            best_distance = distance;
            best = index as u8;
        }
    }
    best
}
