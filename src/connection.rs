// ABOUTME: Length-prefixed frame I/O for SMPP v3.4 sessions over any async byte stream
// ABOUTME: Splits a transport into a buffered FrameReader for the listener and a FrameWriter for senders

use crate::client::{SendError, SmppError, SmppResult};
use crate::codec::{CodecError, Encodable, Frame, PduHeader, PduRegistry};
use bytes::BytesMut;
use std::io::{self, Cursor};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Failure reading the next frame from the stream
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The length prefix is unusable, so frame boundaries are lost
    #[error("stream desynchronized: {0}")]
    Desync(#[source] CodecError),

    /// A complete frame whose body failed to decode. The frame has been
    /// consumed and the stream is still aligned on the next frame.
    #[error("malformed {:?} (sequence {}): {source}", .header.command_id, .header.sequence_number)]
    Malformed {
        header: PduHeader,
        #[source]
        source: CodecError,
    },
}

/// Splits `stream` into independently owned read and write halves
pub fn split<S>(stream: S, registry: PduRegistry) -> (FrameReader, FrameWriter)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    (
        FrameReader::new(read_half, registry),
        FrameWriter::new(write_half),
    )
}

/// Read half of an SMPP session.
///
/// Owned by the listener loop; nothing else reads from the socket.
pub struct FrameReader {
    stream: Box<dyn AsyncRead + Send + Unpin>,

    // Bytes received but not yet parsed into a frame.
    buffer: BytesMut,

    registry: PduRegistry,
}

impl FrameReader {
    pub fn new<R>(stream: R, registry: PduRegistry) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            stream: Box::new(stream),
            buffer: BytesMut::with_capacity(4 * 1024),
            registry,
        }
    }

    /// Read a single `Frame` from the underlying stream.
    ///
    /// Waits until enough data is buffered to parse a whole frame; anything
    /// after it stays buffered for the next call.
    ///
    /// Returns `None` when the peer closes the stream on a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ReadError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // A clean shutdown leaves nothing behind in the buffer. If
                // there is data, the peer closed the socket mid-frame.
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ReadError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "connection reset by peer with {} bytes of a partial frame",
                        self.buffer.len()
                    ),
                )));
            }
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, ReadError> {
        // Checking the length prefix first avoids decoding anything until the
        // whole frame has arrived.
        let length = match Frame::check(&self.buffer) {
            Ok(length) => length,
            Err(CodecError::Incomplete) => return Ok(None),
            Err(e) => return Err(ReadError::Desync(e)),
        };

        // Take the frame out of the buffer before decoding so a bad body
        // never stalls the stream.
        let bytes = self.buffer.split_to(length).freeze();

        let header = PduHeader::decode(&mut Cursor::new(&bytes[..])).map_err(ReadError::Desync)?;
        let mut body = Cursor::new(&bytes[PduHeader::SIZE..]);

        match self.registry.decode_pdu(header.clone(), &mut body) {
            Ok(frame) => Ok(Some(frame)),
            Err(source) => Err(ReadError::Malformed { header, source }),
        }
    }
}

/// Write half of an SMPP session, shared behind a lock by every sender.
///
/// After [`FrameWriter::shutdown`] the write half is released and every
/// further write fails with `NotConnected`.
pub struct FrameWriter {
    stream: Option<BufWriter<Box<dyn AsyncWrite + Send + Unpin>>>,
    buffer: BytesMut,
}

impl FrameWriter {
    pub fn new<W>(stream: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            stream: Some(BufWriter::new(Box::new(stream))),
            buffer: BytesMut::with_capacity(512),
        }
    }

    /// Encodes `pdu` and writes it out in full before returning.
    ///
    /// Encoding failures surface as [`SmppError::Encoding`] with nothing
    /// written; transport failures as [`SendError::Io`].
    pub async fn write_frame<T: Encodable + ?Sized>(&mut self, pdu: &T) -> SmppResult<()> {
        self.buffer.clear();
        pdu.encode(&mut self.buffer).map_err(SmppError::Encoding)?;

        let stream = self.stream.as_mut().ok_or_else(|| {
            SendError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "transport already shut down",
            ))
        })?;
        stream.write_all(&self.buffer).await.map_err(SendError::Io)?;
        stream.flush().await.map_err(SendError::Io)?;
        Ok(())
    }

    /// Flushes anything buffered, closes the write side of the transport and
    /// drops it. Calling it again is a no-op.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => stream.shutdown().await,
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{EnquireLink, SubmitSmResponse, Unbind};
    use tokio::io::duplex;

    #[tokio::test]
    async fn frames_survive_split_reads() {
        let (client, mut server) = duplex(64);
        let mut reader = FrameReader::new(client, PduRegistry::new());

        let bytes = SubmitSmResponse::new(3, "msg-1").to_bytes().unwrap();
        tokio::spawn(async move {
            // Dribble the frame a few bytes at a time
            for chunk in bytes.chunks(5) {
                server.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame, Frame::SubmitSmResp(SubmitSmResponse::new(3, "msg-1")));
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_body_does_not_desync() {
        let (client, mut server) = duplex(256);
        let mut reader = FrameReader::new(client, PduRegistry::new());

        let mut wire = Vec::new();
        // submit_sm_resp whose message_id never terminates
        wire.extend_from_slice(&20u32.to_be_bytes());
        wire.extend_from_slice(&0x8000_0004u32.to_be_bytes());
        wire.extend_from_slice(&0u32.to_be_bytes());
        wire.extend_from_slice(&9u32.to_be_bytes());
        wire.extend_from_slice(b"abcd");
        wire.extend_from_slice(&EnquireLink::new(10).to_bytes().unwrap());
        server.write_all(&wire).await.unwrap();
        drop(server);

        match reader.read_frame().await {
            Err(ReadError::Malformed { header, source }) => {
                assert_eq!(header.sequence_number, 9);
                assert!(matches!(source, CodecError::MissingTerminator { .. }));
            }
            other => panic!("expected malformed frame, got {other:?}"),
        }

        let frame = reader.read_frame().await.unwrap().unwrap();
        assert_eq!(frame, Frame::EnquireLink(EnquireLink::new(10)));
    }

    #[tokio::test]
    async fn bad_length_prefix_is_desync() {
        let (client, mut server) = duplex(64);
        let mut reader = FrameReader::new(client, PduRegistry::new());

        server.write_all(&[0, 0, 0, 4, 0, 0, 0, 0x15]).await.unwrap();

        assert!(matches!(
            reader.read_frame().await,
            Err(ReadError::Desync(CodecError::InvalidPduLength { length: 4, .. }))
        ));
    }

    #[tokio::test]
    async fn eof_mid_frame_is_an_error() {
        let (client, mut server) = duplex(64);
        let mut reader = FrameReader::new(client, PduRegistry::new());

        let bytes = Unbind::new(1).to_bytes().unwrap();
        server.write_all(&bytes[..10]).await.unwrap();
        drop(server);

        assert!(matches!(reader.read_frame().await, Err(ReadError::Io(_))));
    }

    #[tokio::test]
    async fn writer_reports_encoding_errors() {
        let (client, _server) = duplex(64);
        let mut writer = FrameWriter::new(client);

        let pdu = crate::datatypes::BindTransceiver::new(1, "", "pw");
        assert!(matches!(
            writer.write_frame(&pdu).await,
            Err(SmppError::Encoding(CodecError::MissingField("system_id")))
        ));
    }

    #[tokio::test]
    async fn shutdown_signals_eof_and_refuses_writes() {
        let (client, server) = duplex(64);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server, PduRegistry::new());

        writer.write_frame(&EnquireLink::new(1)).await.unwrap();
        writer.shutdown().await.unwrap();
        assert!(writer.is_closed());
        // A second shutdown has nothing left to close
        writer.shutdown().await.unwrap();

        assert_eq!(
            reader.read_frame().await.unwrap(),
            Some(Frame::EnquireLink(EnquireLink::new(1)))
        );
        assert!(reader.read_frame().await.unwrap().is_none());

        assert!(matches!(
            writer.write_frame(&EnquireLink::new(2)).await,
            Err(SmppError::Send(SendError::Io(e))) if e.kind() == io::ErrorKind::NotConnected
        ));
    }
}
