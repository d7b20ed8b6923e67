//! Multi-part send loop.
//!
//! Parts are staged in order onto a single wire buffer - every part except
//! the last carries the more-flag - and the completed message is handed to
//! the socket in one piece, so a subscriber never observes a partial
//! message. A part that fails aborts the whole message at that part: later
//! parts are not staged or sent, and nothing is retried.

use bytes::BytesMut;
use spikecast_protocol::parts::{self, MsgPart, PART_HEADER_SIZE};

use crate::error::{SendError, TransportError};
use crate::socket::PubSocket;

/// Send one multi-part message through the socket.
///
/// # Errors
///
/// Returns the name and index of the part that failed together with the
/// underlying transport error. Parts after the failing one are not sent.
pub fn send_multipart(socket: &PubSocket, message: &[MsgPart]) -> Result<(), SendError> {
    if message.is_empty() {
        return Ok(());
    }

    if socket.is_closed() {
        return Err(SendError {
            part: message[0].name,
            index: 0,
            source: TransportError::Closed,
        });
    }

    let mut total = 0usize;
    for (index, part) in message.iter().enumerate() {
        if part.len() > parts::MAX_PART_SIZE {
            return Err(SendError {
                part: part.name,
                index,
                source: parts::PartError::TooLarge(part.len()).into(),
            });
        }
        total += PART_HEADER_SIZE + part.len();
    }

    let mut wire = BytesMut::with_capacity(total);
    let last = message.len() - 1;
    for (index, part) in message.iter().enumerate() {
        parts::write_part(&mut wire, &part.data, index < last).map_err(|error| SendError {
            part: part.name,
            index,
            source: error.into(),
        })?;
    }

    socket
        .publish(&wire.freeze())
        .map(|_| ())
        .map_err(|source| SendError {
            part: message[0].name,
            index: 0,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NetContext;
    use bytes::Bytes;
    use std::io::Read;
    use std::net::{Ipv4Addr, TcpStream as StdTcpStream};
    use std::time::{Duration, Instant};

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_send_empty_message() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();
        assert!(send_multipart(&socket, &[]).is_ok());
        socket.close();
    }

    #[test]
    fn test_oversized_part_aborts_message() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();

        let mut stream =
            StdTcpStream::connect((Ipv4Addr::LOCALHOST, socket.local_port())).unwrap();
        assert!(wait_for(|| socket.subscriber_count() == 1));

        let message = [
            MsgPart::new("type", Bytes::from_static(&[0, 0])),
            MsgPart::new("data", Bytes::from(vec![0u8; parts::MAX_PART_SIZE + 1])),
            MsgPart::new("tail", Bytes::from_static(b"x")),
        ];
        let error = send_multipart(&socket, &message).unwrap_err();
        assert_eq!(error.part, "data");
        assert_eq!(error.index, 1);

        // Nothing of the aborted message reaches the subscriber.
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut probe = [0u8; 1];
        assert!(stream.read_exact(&mut probe).is_err());

        socket.close();
    }

    #[test]
    fn test_closed_socket_fails_first_part() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();
        socket.close();

        let message = [MsgPart::new("type", Bytes::from_static(&[0, 0]))];
        let error = send_multipart(&socket, &message).unwrap_err();
        assert_eq!(error.part, "type");
        assert_eq!(error.index, 0);
        assert!(matches!(error.source, TransportError::Closed));
    }

    #[test]
    fn test_subscriber_reassembles_parts() {
        let ctx = NetContext::new().unwrap();
        let socket = PubSocket::bind(&ctx, 0).unwrap();

        let mut stream =
            StdTcpStream::connect((Ipv4Addr::LOCALHOST, socket.local_port())).unwrap();
        assert!(wait_for(|| socket.subscriber_count() == 1));

        let message = [
            MsgPart::new("type", Bytes::from_static(&[1, 0])),
            MsgPart::new("json", Bytes::from_static(b"{\"event_type\":\"spike\"}")),
        ];
        send_multipart(&socket, &message).unwrap();

        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut buf = BytesMut::new();
        let mut chunk = [0u8; 256];
        let mut received = Vec::new();
        loop {
            let n = stream.read(&mut chunk).unwrap();
            buf.extend_from_slice(&chunk[..n]);
            while let Some((payload, more)) = parts::read_part(&mut buf) {
                received.push((payload, more));
            }
            if received.len() == 2 {
                break;
            }
        }

        assert_eq!(&received[0].0[..], &[1, 0]);
        assert!(received[0].1);
        assert_eq!(&received[1].0[..], b"{\"event_type\":\"spike\"}");
        assert!(!received[1].1);

        socket.close();
    }
}
