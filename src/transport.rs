use crate::{error::Error, route::Routes, wire};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};
use tracing::{error, instrument, trace};

/// Anything that can put a single datagram on the wire.
pub(crate) trait DatagramSink {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> io::Result<usize>;
}

impl DatagramSink for UdpSocket {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, payload, addr)
    }
}

/// Datagram counts for one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub(crate) sent: usize,
    pub(crate) failed: usize,
}

impl std::ops::AddAssign for Delivery {
    fn add_assign(&mut self, rhs: Self) {
        self.sent += rhs.sent;
        self.failed += rhs.failed;
    }
}

/// Fire-and-forget fan-out of hand records, one datagram per port.
pub(crate) struct Transport<S = UdpSocket> {
    sink: S,
    host: IpAddr,
}

impl Transport<UdpSocket> {
    /// Bind an ephemeral local socket able to reach `host`.
    #[instrument(name = "Transport::bind")]
    pub(crate) fn bind(host: IpAddr) -> Result<Self, Error> {
        let local = match host {
            IpAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            IpAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
        };
        let socket = UdpSocket::bind(local).map_err(|e| Error::BindSocket(e, local))?;
        Ok(Self::new(socket, host))
    }
}

impl<S> Transport<S>
where
    S: DatagramSink,
{
    pub(crate) fn new(sink: S, host: IpAddr) -> Self {
        Self { sink, host }
    }

    /// Send every record to its port. A failed port is logged and skipped.
    pub(crate) fn send(&self, routes: &Routes) -> Delivery {
        let mut delivery = Delivery::default();
        for &(port, ref record) in routes.iter() {
            let payload = wire::encode_record(record);
            let addr = SocketAddr::new(self.host, port);
            match self.sink.send_to(payload.as_bytes(), addr) {
                Ok(bytes) => {
                    trace!(message = "sent hand data", port, bytes);
                    delivery.sent += 1;
                }
                Err(error) => {
                    error!(message = "failed to send data", port, %error);
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        hand::{Hand, Handedness, Landmark, DEFAULT_RECORD},
        route::{route, Destinations},
    };
    use std::{cell::RefCell, rc::Rc, time::Duration};

    /// Records every datagram, failing for the ports in `failing`.
    #[derive(Default, Clone)]
    pub(crate) struct RecordingSink {
        pub(crate) sent: Rc<RefCell<Vec<(SocketAddr, String)>>>,
        pub(crate) attempts: Rc<RefCell<Vec<u16>>>,
        pub(crate) failing: Vec<u16>,
    }

    impl DatagramSink for RecordingSink {
        fn send_to(&self, payload: &[u8], addr: SocketAddr) -> io::Result<usize> {
            self.attempts.borrow_mut().push(addr.port());
            if self.failing.contains(&addr.port()) {
                return Err(io::Error::new(io::ErrorKind::Other, "socket closed"));
            }
            self.sent
                .borrow_mut()
                .push((addr, String::from_utf8_lossy(payload).into_owned()));
            Ok(payload.len())
        }
    }

    const DESTINATIONS: Destinations = Destinations {
        right: 5052,
        left: 5053,
    };

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn one_datagram_per_port() {
        let sink = RecordingSink::default();
        let transport = Transport::new(sink.clone(), localhost());
        let delivery = transport.send(&route(&DESTINATIONS, &[]));

        assert_eq!(delivery, Delivery { sent: 2, failed: 0 });
        let sent = sink.sent.borrow();
        assert_eq!(sent[0].0, "127.0.0.1:5052".parse().unwrap());
        assert_eq!(sent[1].0, "127.0.0.1:5053".parse().unwrap());
        assert_eq!(sent[0].1, wire::encode_record(&DEFAULT_RECORD));
        assert_eq!(sent[1].1, wire::encode_record(&DEFAULT_RECORD));
    }

    #[test]
    fn failed_port_does_not_stop_the_other() {
        let sink = RecordingSink {
            failing: vec![5052],
            ..Default::default()
        };
        let transport = Transport::new(sink.clone(), localhost());
        let delivery = transport.send(&route(&DESTINATIONS, &[]));

        assert_eq!(delivery, Delivery { sent: 1, failed: 1 });
        assert_eq!(*sink.attempts.borrow(), vec![5052, 5053]);
        assert_eq!(sink.sent.borrow()[0].0.port(), 5053);
    }

    #[test]
    fn reaches_a_real_socket() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut landmarks = DEFAULT_RECORD;
        landmarks[0] = Landmark::new(100, 670, 0);
        let hand = Hand {
            handedness: Handedness::Left,
            landmarks,
        };
        let destinations = Destinations {
            right: port.wrapping_add(1),
            left: port,
        };

        let transport = Transport::bind(localhost()).unwrap();
        transport.send(&route(&destinations, &[hand]));

        let mut buf = [0; 1024];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(wire::decode_datagram(&buf[..len]).unwrap(), landmarks);
    }
}
