//! W5500 wired Ethernet bring-up.
//!
//! The controller talks to the agent over a W5500 hanging off SPI2
//! (pin map in [`crate::pins`]).  Bring-up installs the SPI Ethernet
//! driver, applies the static address plan from [`NetConfig`] (the
//! robot segment runs no DHCP), and blocks until the interface reports
//! an address.  The returned [`EthLink`] keeps the driver and its lwIP
//! interface alive; `main` holds it for the life of the process.

use log::info;

use crate::config::{format_ip, NetConfig};
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::eth::{BlockingEth, EspEth, EthDriver, SpiEth, SpiEthChipset};
#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripherals::Peripherals;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::spi::{config::DriverConfig, Dma, SpiDriver};
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::units::Hertz;
#[cfg(target_os = "espidf")]
use esp_idf_svc::ipv4;
#[cfg(target_os = "espidf")]
use esp_idf_svc::netif::{EspNetif, NetifConfiguration};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

#[cfg(target_os = "espidf")]
use crate::pins;

/// Keeps the Ethernet driver and its network interface alive.
///
/// Dropping this stops the driver and tears the interface down.
pub struct EthLink {
    #[cfg(target_os = "espidf")]
    _eth: BlockingEth<EspEth<'static, SpiEth<SpiDriver<'static>>>>,
}

/// CIDR prefix length of a dotted-quad netmask.
fn prefix_len(netmask: [u8; 4]) -> u8 {
    u32::from_be_bytes(netmask).leading_ones() as u8
}

/// Bring the wired link up with the static address plan from `net`.
///
/// Blocks until the link is up.  The W5500 has no burned-in MAC, so the
/// one from `net` is programmed into the chip before the interface
/// starts.
pub fn bring_up(net: &NetConfig) -> Result<EthLink, TransportError> {
    #[cfg(target_os = "espidf")]
    {
        bring_up_w5500(net)
    }

    #[cfg(not(target_os = "espidf"))]
    {
        info!(
            "ethernet(sim): {}/{} gw {} (agent {}:{})",
            format_ip(net.ip),
            prefix_len(net.netmask),
            format_ip(net.gateway),
            format_ip(net.agent_ip),
            net.agent_port
        );
        Ok(EthLink {})
    }
}

#[cfg(target_os = "espidf")]
fn bring_up_w5500(net: &NetConfig) -> Result<EthLink, TransportError> {
    fn eth_err(e: EspError) -> TransportError {
        TransportError::Ethernet(e.code())
    }
    fn addr_err(e: EspError) -> TransportError {
        TransportError::Addressing(e.code())
    }

    let peripherals = Peripherals::take().map_err(eth_err)?;
    let gpio = peripherals.pins;
    let sysloop = EspSystemEventLoop::take().map_err(eth_err)?;

    info!(
        "W5500 on SPI2: sck={} mosi={} miso={} cs={} int={} rst={}",
        pins::W5500_SCK_GPIO,
        pins::W5500_MOSI_GPIO,
        pins::W5500_MISO_GPIO,
        pins::W5500_CS_GPIO,
        pins::W5500_INT_GPIO,
        pins::W5500_RST_GPIO,
    );

    // The gpioN fields below follow the map in `pins`.
    let spi = SpiDriver::new(
        peripherals.spi2,
        gpio.gpio13,
        gpio.gpio11,
        Some(gpio.gpio12),
        &DriverConfig::new().dma(Dma::Auto(4096)),
    )
    .map_err(eth_err)?;

    let driver = EthDriver::new_spi(
        spi,
        gpio.gpio10,
        Some(gpio.gpio14),
        Some(gpio.gpio9),
        SpiEthChipset::W5500,
        Hertz(pins::W5500_SPI_FREQ_HZ),
        Some(&net.mac),
        None,
        sysloop.clone(),
    )
    .map_err(eth_err)?;

    // Fixed addressing: the interface is configured before it starts,
    // so the first packet out already carries the static address.
    let netif = EspNetif::new_with_conf(&NetifConfiguration {
        ip_configuration: Some(ipv4::Configuration::Client(
            ipv4::ClientConfiguration::Fixed(ipv4::ClientSettings {
                ip: net.ip.into(),
                subnet: ipv4::Subnet {
                    gateway: net.gateway.into(),
                    mask: ipv4::Mask(prefix_len(net.netmask)),
                },
                dns: Some(net.dns.into()),
                secondary_dns: None,
            }),
        )),
        ..NetifConfiguration::eth_default_client()
    })
    .map_err(addr_err)?;

    let eth = EspEth::wrap_all(driver, netif).map_err(addr_err)?;
    let mut eth = BlockingEth::wrap(eth, sysloop).map_err(eth_err)?;
    eth.start().map_err(eth_err)?;
    eth.wait_netif_up().map_err(eth_err)?;

    info!(
        "ethernet up: {}/{} gw {} (agent {}:{})",
        format_ip(net.ip),
        prefix_len(net.netmask),
        format_ip(net.gateway),
        format_ip(net.agent_ip),
        net.agent_port
    );

    Ok(EthLink { _eth: eth })
}
