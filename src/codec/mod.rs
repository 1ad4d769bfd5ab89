//! Wire codec: packet header, message header, and the HELLO/TC bodies.
//!
//! All multi-byte fields are network byte order. Parsing never panics on
//! attacker-controlled bytes: truncated trailing data is dropped, not
//! treated as an error.

pub mod hello;
pub mod link_code;
pub mod mantissa;
pub mod tc;

pub use hello::{encode_hello_body, parse_hello_body, HelloBody, LinkGroup};
pub use link_code::{decode_link_code, make_link_code, CodecError};
pub use mantissa::{decode_time, encode_time};
pub use tc::{encode_tc_body, parse_tc_body, TcBody};

use std::net::Ipv4Addr;

use crate::consts::{HELLO_MESSAGE, TC_MESSAGE};

pub const PACKET_HEADER_LEN: usize = 4;
pub const MESSAGE_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub length: u16,
    pub seq: u16,
}

pub fn encode_packet_header(body_len: usize, seq: u16) -> [u8; PACKET_HEADER_LEN] {
    let total = (PACKET_HEADER_LEN + body_len) as u16;
    let mut out = [0u8; PACKET_HEADER_LEN];
    out[0..2].copy_from_slice(&total.to_be_bytes());
    out[2..4].copy_from_slice(&seq.to_be_bytes());
    out
}

pub fn decode_packet_header(data: &[u8]) -> Option<PacketHeader> {
    if data.len() < PACKET_HEADER_LEN {
        return None;
    }
    Some(PacketHeader {
        length: u16::from_be_bytes([data[0], data[1]]),
        seq: u16::from_be_bytes([data[2], data[3]]),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub msg_type: u8,
    pub vtime: u8,
    pub msg_size: u16,
    pub originator: Ipv4Addr,
    pub ttl: u8,
    pub hop_count: u8,
    pub msg_seq: u16,
}

pub fn encode_message_header(header: &MessageHeader) -> [u8; MESSAGE_HEADER_LEN] {
    let mut out = [0u8; MESSAGE_HEADER_LEN];
    out[0] = header.msg_type;
    out[1] = header.vtime;
    out[2..4].copy_from_slice(&header.msg_size.to_be_bytes());
    out[4..8].copy_from_slice(&header.originator.octets());
    out[8] = header.ttl;
    out[9] = header.hop_count;
    out[10..12].copy_from_slice(&header.msg_seq.to_be_bytes());
    out
}

fn decode_message_header(data: &[u8]) -> MessageHeader {
    MessageHeader {
        msg_type: data[0],
        vtime: data[1],
        msg_size: u16::from_be_bytes([data[2], data[3]]),
        originator: Ipv4Addr::new(data[4], data[5], data[6], data[7]),
        ttl: data[8],
        hop_count: data[9],
        msg_seq: u16::from_be_bytes([data[10], data[11]]),
    }
}

/// Build a complete HELLO message (header + body) for the given sequence
/// number. `vtime_seconds` is the neighbor-hold validity advertised on the
/// header, per RFC 3626 Section 6.
pub fn build_hello_message(
    originator: Ipv4Addr,
    msg_seq: u16,
    vtime_seconds: f64,
    body: &HelloBody,
) -> Vec<u8> {
    let body_bytes = encode_hello_body(body);
    let header = MessageHeader {
        msg_type: HELLO_MESSAGE,
        vtime: encode_time(vtime_seconds),
        msg_size: (MESSAGE_HEADER_LEN + body_bytes.len()) as u16,
        originator,
        ttl: 1,
        hop_count: 0,
        msg_seq,
    };
    let mut out = encode_message_header(&header).to_vec();
    out.extend_from_slice(&body_bytes);
    out
}

/// Build a complete TC message (header + body).
pub fn build_tc_message(
    originator: Ipv4Addr,
    msg_seq: u16,
    vtime_seconds: f64,
    body: &TcBody,
) -> Vec<u8> {
    let body_bytes = encode_tc_body(body);
    let header = MessageHeader {
        msg_type: TC_MESSAGE,
        vtime: encode_time(vtime_seconds),
        msg_size: (MESSAGE_HEADER_LEN + body_bytes.len()) as u16,
        originator,
        ttl: 255,
        hop_count: 0,
        msg_seq,
    };
    let mut out = encode_message_header(&header).to_vec();
    out.extend_from_slice(&body_bytes);
    out
}

/// Wrap a sequence of already-encoded messages into one packet.
pub fn encode_packet(packet_seq: u16, messages: &[Vec<u8>]) -> Vec<u8> {
    let body_len: usize = messages.iter().map(Vec::len).sum();
    let mut out = encode_packet_header(body_len, packet_seq).to_vec();
    for message in messages {
        out.extend_from_slice(message);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Hello(HelloBody),
    Tc(TcBody),
    /// Recognized header but unsupported/undecodable body (e.g. unknown
    /// msg_type). The raw message is preserved so it can still be forwarded.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub header: MessageHeader,
    pub body: MessageBody,
    /// The exact header+body bytes as they appeared in the packet, used to
    /// rewrite ttl/hop_count in place when forwarding.
    pub raw: Vec<u8>,
}

/// Parse every message in a packet body, in order. Stops at the first
/// position that cannot hold a full message header; a message whose
/// declared `msg_size` runs past the buffer is also dropped rather than
/// causing the whole datagram to fail.
pub fn parse_packet_messages(packet: &[u8]) -> Vec<DecodedMessage> {
    let Some(_header) = decode_packet_header(packet) else {
        return Vec::new();
    };

    let mut messages = Vec::new();
    let mut cursor = PACKET_HEADER_LEN;

    while packet.len() - cursor >= MESSAGE_HEADER_LEN {
        let header = decode_message_header(&packet[cursor..cursor + MESSAGE_HEADER_LEN]);
        let msg_size = header.msg_size as usize;
        if msg_size < MESSAGE_HEADER_LEN {
            break;
        }
        let body_end = cursor + msg_size;
        if body_end > packet.len() {
            break;
        }

        let body_bytes = &packet[cursor + MESSAGE_HEADER_LEN..body_end];
        let body = match header.msg_type {
            HELLO_MESSAGE => parse_hello_body(body_bytes)
                .map(MessageBody::Hello)
                .unwrap_or(MessageBody::Unknown),
            TC_MESSAGE => parse_tc_body(body_bytes)
                .map(MessageBody::Tc)
                .unwrap_or(MessageBody::Unknown),
            _ => MessageBody::Unknown,
        };

        messages.push(DecodedMessage {
            header,
            body,
            raw: packet[cursor..body_end].to_vec(),
        });
        cursor = body_end;
    }

    messages
}

/// Rewrite the ttl/hop_count fields of a raw encoded message in place, as
/// done when forwarding (RFC 3626 Section 3.4.1).
pub fn rewrite_ttl_hop(raw: &mut [u8], new_ttl: u8, new_hop: u8) {
    if raw.len() >= MESSAGE_HEADER_LEN {
        raw[8] = new_ttl;
        raw[9] = new_hop;
    }
}
