//! A receiver for checking a running stream without the consuming engine.

use crate::{
    config::Endpoints,
    error::Error,
    hand::{HandLandmark, Handedness, Landmarks},
    wire,
};
use std::{
    io,
    net::{SocketAddr, UdpSocket},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{info, instrument, warn};

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const MAX_DATAGRAM_SIZE: usize = 4096;

#[derive(Debug, structopt::StructOpt)]
pub(crate) struct ListenOpt {
    #[structopt(flatten)]
    pub(crate) endpoints: Endpoints,
}

/// What one poll of a port turned up.
#[derive(Debug)]
pub(crate) enum Received {
    Record(Handedness, Landmarks),
    Malformed(Handedness, Error),
    Idle,
}

pub(crate) struct Listener {
    sockets: [(Handedness, UdpSocket); 2],
    buf: Vec<u8>,
}

impl Listener {
    #[instrument(name = "Listener::bind", skip(endpoints), fields(host = %endpoints.host))]
    pub(crate) fn bind(endpoints: &Endpoints) -> Result<Self, Error> {
        let destinations = endpoints.destinations()?;
        let bind = |port| {
            let addr = SocketAddr::new(endpoints.host, port);
            UdpSocket::bind(addr).map_err(|e| Error::BindSocket(e, addr))
        };
        let listener = Self::new(bind(destinations.right)?, bind(destinations.left)?)?;
        info!(
            message = "listening",
            right_port = destinations.right,
            left_port = destinations.left,
        );
        Ok(listener)
    }

    pub(crate) fn new(right: UdpSocket, left: UdpSocket) -> Result<Self, Error> {
        for socket in [&right, &left].iter() {
            socket
                .set_read_timeout(Some(READ_TIMEOUT))
                .map_err(Error::SetReadTimeout)?;
        }
        Ok(Self {
            sockets: [(Handedness::Right, right), (Handedness::Left, left)],
            buf: vec![0; MAX_DATAGRAM_SIZE],
        })
    }

    /// Wait up to the read timeout for one datagram on the `index`th port.
    fn receive(&mut self, index: usize) -> Result<Received, Error> {
        let (handedness, socket) = &self.sockets[index];
        let handedness = *handedness;
        match socket.recv_from(&mut self.buf) {
            Ok((len, _)) => Ok(match wire::decode_datagram(&self.buf[..len]) {
                Ok(record) => Received::Record(handedness, record),
                Err(error) => Received::Malformed(handedness, error),
            }),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(Received::Idle)
            }
            Err(e) => Err(Error::ReceiveDatagram(e)),
        }
    }

    /// Poll both ports in turn until `running` is cleared.
    pub(crate) fn run(&mut self, running: &Arc<AtomicBool>) -> Result<(), Error> {
        let mut received = 0_usize;
        while running.load(Ordering::SeqCst) {
            for index in 0..self.sockets.len() {
                match self.receive(index)? {
                    Received::Record(handedness, record) => {
                        received += 1;
                        let wrist = record[HandLandmark::Wrist.idx()];
                        let index_tip = record[HandLandmark::IndexFingerTip.idx()];
                        info!(
                            message = "hand record",
                            %handedness,
                            %wrist,
                            %index_tip,
                        );
                    }
                    Received::Malformed(handedness, error) => {
                        warn!(message = "malformed datagram", %handedness, %error);
                    }
                    Received::Idle => {}
                }
            }
        }
        info!(message = "stopped listening", received);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{Landmark, DEFAULT_RECORD};

    fn listener() -> (Listener, SocketAddr, SocketAddr) {
        let right = UdpSocket::bind("127.0.0.1:0").unwrap();
        let left = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addrs = (right.local_addr().unwrap(), left.local_addr().unwrap());
        (Listener::new(right, left).unwrap(), addrs.0, addrs.1)
    }

    #[test]
    fn decodes_record_on_its_port() {
        let (mut listener, right, left) = listener();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        let mut record = DEFAULT_RECORD;
        record[0] = Landmark::new(100, 670, 0);
        sender
            .send_to(wire::encode_record(&record).as_bytes(), left)
            .unwrap();

        assert!(matches!(listener.receive(0).unwrap(), Received::Idle));
        match listener.receive(1).unwrap() {
            Received::Record(Handedness::Left, received) => assert_eq!(received, record),
            other => panic!("unexpected {:?}", other),
        }

        sender
            .send_to(wire::encode_record(&DEFAULT_RECORD).as_bytes(), right)
            .unwrap();
        assert!(matches!(
            listener.receive(0).unwrap(),
            Received::Record(Handedness::Right, _)
        ));
    }

    #[test]
    fn malformed_datagram_is_reported() {
        let (mut listener, right, _) = listener();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"[(1, 2)]", right).unwrap();

        assert!(matches!(
            listener.receive(0).unwrap(),
            Received::Malformed(Handedness::Right, Error::MalformedRecord(_))
        ));
    }

    #[test]
    fn stops_when_interrupted() {
        let (mut listener, _, _) = listener();
        let running = Arc::new(AtomicBool::new(false));
        assert!(listener.run(&running).is_ok());
    }
}
