//! Wi-Fi access-point scan demo.
//!
//! Subscribes for scan events, submits one scan request and prints every
//! discovered network until the scan-done event arrives (bounded by a fixed
//! wait). Failures are logged only; the exit code is always 0.

use core::time::Duration;

use log::{error, info, warn};

use net_svc::eventloop::EventLoop;
use net_svc::log::ConsoleLogger;
use net_svc::sim::SimWifi;
use net_svc::wifi::{BlockingWifi, WifiEvent, WifiEventKind};

const SCAN_WAIT: Duration = Duration::from_secs(10);

fn main() {
    ConsoleLogger::initialize_default();

    let event_loop = EventLoop::new();
    let mut wifi = match BlockingWifi::wrap(SimWifi::new(event_loop.clone()), event_loop) {
        Ok(wifi) => wifi,
        Err(err) => {
            error!("Wi-Fi setup failed: {}", err);
            return;
        }
    };

    match wifi.sta_netif() {
        Some(netif) => info!("Using network interface {} (index {})", netif.name, netif.index),
        None => warn!("No network interface found"),
    }

    let subscription = wifi.subscribe(
        WifiEventKind::ScanResult | WifiEventKind::ScanDone,
        |event| match event {
            WifiEvent::ScanResult(ap) => info!(
                "Found SSID: {}, Channel: {}, RSSI: {}",
                ap.ssid, ap.channel, ap.signal_strength
            ),
            WifiEvent::ScanDone => info!("Wi-Fi scan completed"),
            _ => (),
        },
    );

    let _subscription = match subscription {
        Ok(subscription) => subscription,
        Err(err) => {
            error!("Event callback registration failed: {}", err);
            return;
        }
    };

    if let Err(err) = wifi.start_scan() {
        error!("Wi-Fi scan failed: {}", err);
        return;
    }

    info!("Scan started");

    if let Err(err) = wifi.wait_scan_done(SCAN_WAIT) {
        warn!("Scan did not complete: {}", err);
    }
}
