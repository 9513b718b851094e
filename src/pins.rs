//! GPIO pin assignments for the W5500 Ethernet module.
//!
//! Single source of truth — the transport bring-up references this module
//! rather than hard-coding pin numbers.  The W5500 hangs off SPI2 with a
//! dedicated reset and interrupt line.

// ---------------------------------------------------------------------------
// W5500 SPI bus
// ---------------------------------------------------------------------------

/// SPI chip select (active LOW).
pub const W5500_CS_GPIO: i32 = 14;
/// SPI clock.
pub const W5500_SCK_GPIO: i32 = 13;
/// SPI MOSI (controller out).
pub const W5500_MOSI_GPIO: i32 = 11;
/// SPI MISO (controller in).
pub const W5500_MISO_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// W5500 control lines
// ---------------------------------------------------------------------------

/// Hardware reset (active LOW, held ≥ 500 µs at power-up).
pub const W5500_RST_GPIO: i32 = 9;
/// Interrupt output from the W5500 (active LOW).
pub const W5500_INT_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// SPI configuration
// ---------------------------------------------------------------------------

/// SPI clock for the W5500.  The chip tops out at 33 MHz; 20 MHz is the
/// conservative figure used across the ESP-IDF Ethernet examples.
pub const W5500_SPI_FREQ_HZ: u32 = 20_000_000;
