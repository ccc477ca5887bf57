//! In-process Wi-Fi driver simulation
//!
//! Stands in for the radio: implements [`WifiDriver`] and posts its events
//! from a spawned thread, so subscribers observe the same cross-context
//! delivery a hardware stack produces. Both demo binaries and the test-suite
//! run on top of it.

use core::time::Duration;

use std::thread;

use ::log::*;

use crate::errors::{ErrorCode, NetError};
use crate::eventloop::EventLoop;
use crate::wifi::{
    AccessPointInfo, AuthMethod, ClientConfiguration, ConnectStatus, NetifInfo, Protocol,
    SecondaryChannel, WifiDriver, WifiEvent,
};

/// Simulated Wi-Fi driver.
pub struct SimWifi {
    event_loop: EventLoop<WifiEvent>,
    networks: Vec<AccessPointInfo>,
    connect_status: ConnectStatus,
    event_delay: Duration,
}

impl SimWifi {
    /// Creates a driver with a small default neighborhood and a successful
    /// connect outcome.
    pub fn new(event_loop: EventLoop<WifiEvent>) -> Self {
        Self {
            event_loop,
            networks: vec![
                Self::access_point("muon", 1, -42),
                Self::access_point("hadron-guest", 6, -67),
                Self::access_point("quark24", 11, -81),
            ],
            connect_status: ConnectStatus(0),
            event_delay: Duration::from_millis(10),
        }
    }

    /// Replaces the set of networks a scan discovers, in discovery order.
    pub fn with_networks(mut self, networks: Vec<AccessPointInfo>) -> Self {
        self.networks = networks;
        self
    }

    /// Sets the status code every connect attempt reports. Zero is success.
    pub fn with_connect_status(mut self, status: i32) -> Self {
        self.connect_status = ConnectStatus(status);
        self
    }

    /// Sets the pacing delay between posted events.
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    /// A fully-populated scan record for the given SSID/channel/RSSI.
    pub fn access_point(ssid: &str, channel: u8, signal_strength: i8) -> AccessPointInfo {
        AccessPointInfo {
            ssid: ssid.try_into().unwrap_or_default(),
            bssid: [0x02, 0x00, 0x00, 0x00, 0x00, channel],
            channel,
            secondary_channel: SecondaryChannel::None,
            signal_strength,
            protocols: Protocol::P802D11B | Protocol::P802D11BG | Protocol::P802D11BGN,
            auth_method: Some(AuthMethod::WPA2Personal),
        }
    }

    fn post_later(&self, name: &str, events: Vec<WifiEvent>) -> Result<(), NetError> {
        let event_loop = self.event_loop.clone();
        let delay = self.event_delay;

        thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                for event in events {
                    thread::sleep(delay);
                    event_loop.post(&event);
                }
            })
            .map(|_| ())
            .map_err(NetError::from)
    }
}

impl WifiDriver for SimWifi {
    fn sta_netif(&self) -> Option<NetifInfo> {
        Some(NetifInfo {
            index: 1,
            name: "sim0".try_into().unwrap_or_default(),
        })
    }

    fn start_scan(&mut self) -> Result<(), NetError> {
        debug!("Scan submitted, {} simulated networks", self.networks.len());

        let mut events: Vec<WifiEvent> = self
            .networks
            .iter()
            .cloned()
            .map(WifiEvent::ScanResult)
            .collect();
        events.push(WifiEvent::ScanDone);

        self.post_later("sim-wifi-scan", events)
    }

    fn connect(&mut self, conf: &ClientConfiguration) -> Result<(), NetError> {
        if conf.ssid.is_empty() {
            return Err(ErrorCode::InvalidArg.into());
        }

        debug!("Connect submitted for SSID {}", conf.ssid);

        self.post_later(
            "sim-wifi-connect",
            vec![WifiEvent::ConnectResult(self.connect_status)],
        )
    }
}
