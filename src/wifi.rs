//! WiFi support

use core::time::Duration;

use std::sync::{Arc, Mutex};

use ::log::*;

use enumset::{EnumSet, EnumSetType};

use crate::errors::{ErrorCode, NetError};
use crate::eventloop::{EventLoop, Subscription, Wait};

pub use embedded_svc::wifi::{
    AccessPointInfo, AuthMethod, ClientConfiguration, Configuration, Protocol, SecondaryChannel,
};

/// Kinds of events a Wi-Fi driver posts, usable as a subscription bitmask.
#[derive(EnumSetType, Debug)]
pub enum WifiEventKind {
    ScanResult,
    ScanDone,
    ConnectResult,
}

/// Events posted by the Wi-Fi driver on the program's event loop.
#[derive(Clone, Debug)]
pub enum WifiEvent {
    /// One discovered access point; delivered per network, in discovery order.
    ScanResult(AccessPointInfo),
    ScanDone,
    /// Outcome of a connect request; delivered at most once per request.
    ConnectResult(ConnectStatus),
}

impl WifiEvent {
    pub fn kind(&self) -> WifiEventKind {
        match self {
            Self::ScanResult(_) => WifiEventKind::ScanResult,
            Self::ScanDone => WifiEventKind::ScanDone,
            Self::ConnectResult(_) => WifiEventKind::ConnectResult,
        }
    }
}

/// Status of a connect attempt as reported by the driver. Zero is success.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConnectStatus(pub i32);

impl ConnectStatus {
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    /// Converts a nonzero status into an error carrying the raw code.
    pub fn into_result(self) -> Result<(), NetError> {
        match NetError::from_code(self.0) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Descriptor of a network interface exposed by the driver.
#[derive(Clone, Debug)]
pub struct NetifInfo {
    pub index: u32,
    pub name: heapless::String<16>,
}

/// The seam between the blocking service and whatever produces radio events.
///
/// Submission is synchronous and non-blocking; results arrive as
/// [`WifiEvent`]s posted on the event loop the driver was constructed with.
/// Each request posts its terminal event (`ScanDone`, `ConnectResult`) at
/// most once.
pub trait WifiDriver {
    /// The default station interface, if the driver has one.
    fn sta_netif(&self) -> Option<NetifInfo>;

    /// Submits a scan request.
    fn start_scan(&mut self) -> Result<(), NetError>;

    /// Submits a connect request for the given client configuration.
    fn connect(&mut self, conf: &ClientConfiguration) -> Result<(), NetError>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum WifiScanStatus {
    Idle,
    Started,
    Done,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum WifiStaStatus {
    Idle,
    Connecting,
    Connected,
}

struct WifiStatus {
    scan: WifiScanStatus,
    sta: WifiStaStatus,
    connect: Option<ConnectStatus>,
}

/// Wraps a [`WifiDriver`] and offers strictly synchronous (blocking) calls
/// for its functionality.
///
/// An internal subscription tracks the driver's events in a status record;
/// the blocking calls submit a request and then wait on the event loop until
/// the status shows the terminal event, so no fixed sleeps are involved.
pub struct BlockingWifi<T> {
    driver: T,
    event_loop: EventLoop<WifiEvent>,
    status: Arc<Mutex<WifiStatus>>,
    _subscription: Subscription<WifiEvent>,
}

impl<T> BlockingWifi<T>
where
    T: WifiDriver,
{
    pub fn wrap(driver: T, event_loop: EventLoop<WifiEvent>) -> Result<Self, NetError> {
        let status = Arc::new(Mutex::new(WifiStatus {
            scan: WifiScanStatus::Idle,
            sta: WifiStaStatus::Idle,
            connect: None,
        }));

        let s_status = status.clone();
        let subscription = event_loop.subscribe(move |event: &WifiEvent| {
            let mut guard = s_status.lock().unwrap();

            match event {
                WifiEvent::ScanResult(_) => (),
                WifiEvent::ScanDone => guard.scan = WifiScanStatus::Done,
                WifiEvent::ConnectResult(result) => {
                    guard.connect = Some(*result);
                    guard.sta = if result.is_ok() {
                        WifiStaStatus::Connected
                    } else {
                        WifiStaStatus::Idle
                    };
                }
            }
        })?;

        Ok(Self {
            driver,
            event_loop,
            status,
            _subscription: subscription,
        })
    }

    /// Returns the underlying driver
    pub fn driver(&self) -> &T {
        &self.driver
    }

    /// Returns the underlying driver, as mutable
    pub fn driver_mut(&mut self) -> &mut T {
        &mut self.driver
    }

    pub fn event_loop(&self) -> &EventLoop<WifiEvent> {
        &self.event_loop
    }

    /// As per [`WifiDriver::sta_netif()`]
    pub fn sta_netif(&self) -> Option<NetifInfo> {
        self.driver.sta_netif()
    }

    /// Registers `callback` for the event kinds selected by the bitmask.
    ///
    /// The callback runs on the driver's posting context and must not block.
    pub fn subscribe<F>(
        &self,
        events: EnumSet<WifiEventKind>,
        callback: F,
    ) -> Result<Subscription<WifiEvent>, NetError>
    where
        F: Fn(&WifiEvent) + Send + Sync + 'static,
    {
        self.event_loop.subscribe(move |event: &WifiEvent| {
            if events.contains(event.kind()) {
                callback(event);
            }
        })
    }

    /// Submits a scan request and returns immediately; results arrive as
    /// events. Use [`BlockingWifi::wait_scan_done`] to block until the scan
    /// is over.
    pub fn start_scan(&mut self) -> Result<(), NetError> {
        debug!("Scan requested");

        self.status.lock().unwrap().scan = WifiScanStatus::Started;

        if let Err(err) = self.driver.start_scan() {
            self.status.lock().unwrap().scan = WifiScanStatus::Idle;
            return Err(err);
        }

        debug!("Scanning");

        Ok(())
    }

    /// Blocks until the scan-done event of the current scan arrives, or
    /// `ETIMEDOUT` once `timeout` elapses.
    pub fn wait_scan_done(&self, timeout: Duration) -> Result<(), NetError> {
        let wait = Wait::new(&self.event_loop)?;

        wait.wait_while(
            || Ok(self.status.lock().unwrap().scan != WifiScanStatus::Done),
            Some(timeout),
        )
    }

    /// Runs one whole scan: subscribes, submits, waits for completion and
    /// returns the discovered access points in discovery order.
    pub fn scan(&mut self, timeout: Duration) -> Result<Vec<AccessPointInfo>, NetError> {
        let found = Arc::new(Mutex::new(Vec::new()));

        let sink = found.clone();
        let _subscription = self.subscribe(EnumSet::only(WifiEventKind::ScanResult), move |event| {
            if let WifiEvent::ScanResult(info) = event {
                sink.lock().unwrap().push(info.clone());
            }
        })?;

        self.start_scan()?;
        self.wait_scan_done(timeout)?;

        let mut guard = found.lock().unwrap();
        Ok(core::mem::take(&mut *guard))
    }

    /// Submits a connect request and blocks until its connect-result event.
    ///
    /// The wait is released by the event's arrival regardless of the outcome;
    /// the recorded status is then checked and a nonzero status comes back as
    /// an error carrying the raw code. `None` waits forever; the event is
    /// the only way on.
    pub fn connect(
        &mut self,
        conf: &ClientConfiguration,
        timeout: Option<Duration>,
    ) -> Result<(), NetError> {
        debug!("Connect requested: SSID {}", conf.ssid);

        {
            let mut status = self.status.lock().unwrap();
            status.sta = WifiStaStatus::Connecting;
            status.connect = None;
        }

        if let Err(err) = self.driver.connect(conf) {
            self.status.lock().unwrap().sta = WifiStaStatus::Idle;
            return Err(err);
        }

        debug!("Connecting");

        let wait = Wait::new(&self.event_loop)?;
        wait.wait_while(
            || Ok(self.status.lock().unwrap().connect.is_none()),
            timeout,
        )?;

        let connect = self.status.lock().unwrap().connect;
        match connect {
            Some(status) => status.into_result(),
            None => Err(ErrorCode::TimedOut.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status.lock().unwrap().sta == WifiStaStatus::Connected
    }

    /// Outcome of the last completed connect attempt, if any.
    pub fn connect_status(&self) -> Option<ConnectStatus> {
        self.status.lock().unwrap().connect
    }
}
