//! Stream socket establishment

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};

use ::log::*;

use crate::errors::{ErrorCode, NetError};

/// Opens a stream socket to an IPv4 literal and connects it.
///
/// There is no invalid-handle sentinel to check afterwards: the caller gets
/// either a connected stream or the mapped errno-style error.
pub fn connect_ipv4(server: &str, port: u16) -> Result<TcpStream, NetError> {
    let host: Ipv4Addr = server.parse().map_err(|_| {
        error!("Not an IPv4 literal: {}", server);
        NetError::from(ErrorCode::InvalidArg)
    })?;

    let addr = SocketAddr::V4(SocketAddrV4::new(host, port));

    debug!("Opening stream socket to {}", addr);

    match TcpStream::connect(addr) {
        Ok(stream) => {
            debug!("Socket connected to {}", addr);
            Ok(stream)
        }
        Err(err) => {
            error!("Cannot connect to remote {} ({})", addr, err);
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_literal_is_einval() {
        let err = connect_ipv4("not-an-address", 80).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorCode::InvalidArg));
    }

    #[test]
    fn host_names_are_not_resolved() {
        let err = connect_ipv4("localhost", 80).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorCode::InvalidArg));
    }
}
