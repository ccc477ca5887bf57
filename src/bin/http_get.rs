//! Wi-Fi station + one-shot HTTP GET demo.
//!
//! Associates to a WPA2 access point, opens a TCP socket to a fixed server
//! and issues a single GET for "/", printing response progress and the
//! status line. Exits 0 on success, with the errno-style code of the failing
//! step otherwise.

use core::time::Duration;

use std::process;

use log::{error, info};

use net_svc::errors::ErrorCode;
use net_svc::eventloop::EventLoop;
use net_svc::http::{self, Delivery, Method, Request};
use net_svc::log::ConsoleLogger;
use net_svc::sim::SimWifi;
use net_svc::socket;
use net_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration};

const WIFI_AP_SSID: &str = "__SSID__";
const WIFI_AP_PSK: &str = "__PSK__";
const SERVER_ADDR4: &str = "192.168.0.123";
const HTTP_PORT: u16 = 8000;
const MAX_RECV_BUF_LEN: usize = 512;
const HTTP_TIMEOUT: Duration = Duration::from_millis(3000);

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    ConsoleLogger::initialize_default();

    let event_loop = EventLoop::new();
    let mut wifi = match BlockingWifi::wrap(SimWifi::new(event_loop.clone()), event_loop) {
        Ok(wifi) => wifi,
        Err(err) => {
            error!("Wi-Fi setup failed: {}", err);
            return err.code();
        }
    };

    info!("Start trying to establish a Wi-Fi connection");

    let conf = ClientConfiguration {
        ssid: WIFI_AP_SSID.try_into().unwrap_or_default(),
        password: WIFI_AP_PSK.try_into().unwrap_or_default(),
        auth_method: AuthMethod::WPA2Personal,
        ..Default::default()
    };

    // Wait-forever semantics: the connect-result event is the only way on.
    match wifi.connect(&conf, None) {
        Ok(()) => info!("Connected"),
        Err(err) => {
            error!("Connection request failed ({})", err.code());
            return err.code();
        }
    }

    info!("Start to open new IPv4 socket");

    let mut stream = match socket::connect_ipv4(SERVER_ADDR4, HTTP_PORT) {
        Ok(stream) => stream,
        Err(_) => {
            error!("Cannot create HTTP connection");
            return ErrorCode::ConnAborted.into();
        }
    };

    let mut recv_buf = [0u8; MAX_RECV_BUF_LEN];
    let request = Request {
        method: Method::Get,
        path: "/",
        host: SERVER_ADDR4,
        protocol: "HTTP/1.1",
        timeout: HTTP_TIMEOUT,
        recv_buf: &mut recv_buf,
    };

    let result = http::request(&mut stream, request, |response, delivery| match delivery {
        Delivery::Partial => info!("Partial data received ({} bytes)", response.received),
        Delivery::Final => {
            info!("All the data received ({} bytes)", response.received);
            info!("Response status {}", response.status_line);
        }
    });

    match result {
        Ok(_) => 0,
        Err(err) => {
            error!("HTTP request failed: {}", err);
            err.code()
        }
    }
}
