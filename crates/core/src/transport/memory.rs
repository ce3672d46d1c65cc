use std::io;
use std::net::SocketAddr;

use parking_lot::Mutex;

use super::DatagramSink;

/// Sink that keeps every datagram instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Datagrams sent to `addr`, oldest first.
    pub fn sent_to(&self, addr: SocketAddr) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| *to == addr)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl DatagramSink for RecordingSink {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.sent.lock().push((addr, payload.to_vec()));
        Ok(payload.len())
    }
}
