//! Inbound frame scanning and gRPC message extraction

use super::frames::FrameHeader;
use super::{FRAME_TYPE_DATA, MAX_FRAME_SIZE};
use log::{debug, warn};

/// gRPC envelope prefix: compression flag + big-endian length.
const ENVELOPE_SIZE: usize = 5;

/// Upper bound on retained unparsed bytes. A tail that grows past this is
/// not a partial frame, it is garbage; drop it and resynchronize.
const MAX_TAIL: usize = 256 * 1024;

/// Per-connection reassembly buffer that scans received bytes for DATA
/// frames and extracts the protobuf payloads inside their gRPC envelopes.
///
/// Frames split across multiple socket reads are retained until the rest
/// arrives. Non-DATA frames (SETTINGS, HEADERS, WINDOW_UPDATE, trailers) are
/// skipped whole; bytes that do not look like a frame header at all advance
/// the scan by one byte until it resynchronizes.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    buf: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of retained, not-yet-consumed bytes.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Extract the protobuf payload of every complete DATA frame currently
    /// buffered, consuming the scanned bytes and retaining any trailing
    /// partial frame for the next call.
    ///
    /// A DATA frame whose payload is not a well-formed gRPC envelope (or
    /// whose envelope length disagrees with the frame) is dropped, not
    /// retried.
    pub fn drain_messages(&mut self) -> Vec<Vec<u8>> {
        let mut messages = Vec::new();
        let mut pos = 0;

        while let Some(header) = FrameHeader::parse(&self.buf[pos..]) {
            if header.length > MAX_FRAME_SIZE {
                // Not a plausible frame header; resync one byte at a time
                pos += 1;
                continue;
            }

            let frame_end = pos + FrameHeader::SIZE + header.length as usize;
            if frame_end > self.buf.len() {
                // Partial frame, wait for more bytes
                break;
            }

            if header.frame_type == FRAME_TYPE_DATA {
                let payload = &self.buf[pos + FrameHeader::SIZE..frame_end];
                if let Some(message) = extract_envelope(payload) {
                    messages.push(message.to_vec());
                } else {
                    debug!(
                        "dropping DATA frame with malformed gRPC envelope ({} bytes)",
                        payload.len()
                    );
                }
            }

            pos = frame_end;
        }

        self.buf.drain(..pos);

        if self.buf.len() > MAX_TAIL {
            warn!(
                "discarding {} unparseable buffered bytes",
                self.buf.len()
            );
            self.buf.clear();
        }

        messages
    }
}

/// Validate the 5-byte gRPC envelope and return the exact message slice, or
/// `None` if the declared length does not fit the available bytes.
fn extract_envelope(payload: &[u8]) -> Option<&[u8]> {
    if payload.len() < ENVELOPE_SIZE {
        return None;
    }

    let declared =
        u32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]) as usize;
    if ENVELOPE_SIZE + declared > payload.len() {
        return None;
    }

    Some(&payload[ENVELOPE_SIZE..ENVELOPE_SIZE + declared])
}
