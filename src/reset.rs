//! Fatal-error restart path.
//!
//! A fatal link error means local middleware or transport state is
//! wrong in a way no retry from this process can fix.  The device logs
//! the reason, waits out a short cooldown so a persistent fault cannot
//! turn into a tight reboot loop, and soft-resets.

use log::error;

use crate::error::LinkError;

/// Log `reason`, wait `cooldown_ms`, then soft-reset the device.
#[cfg(target_os = "espidf")]
pub fn restart_loop(reason: &LinkError, cooldown_ms: u32) -> ! {
    error!("FATAL | {}: restarting in {}ms", reason, cooldown_ms);
    esp_idf_svc::hal::delay::FreeRtos::delay_ms(cooldown_ms);
    esp_idf_svc::hal::reset::restart();
}

#[cfg(not(target_os = "espidf"))]
pub fn restart_loop(reason: &LinkError, cooldown_ms: u32) -> ! {
    error!("FATAL | {}: restarting in {}ms", reason, cooldown_ms);
    panic!("device restart (simulation: no hardware reset)");
}
