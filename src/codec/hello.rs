//! HELLO message body (RFC 3626 Section 6.1): reserved(2) + htime(1) +
//! willingness(1), followed by zero or more link messages, each
//! link_code(1) + reserved(1) + size(2) + N * IPv4(4).

use std::net::Ipv4Addr;

use super::mantissa::{decode_time, encode_time};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkGroup {
    pub link_code: u8,
    pub addrs: Vec<Ipv4Addr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HelloBody {
    pub htime_seconds: f64,
    pub willingness: u8,
    pub groups: Vec<LinkGroup>,
}

pub fn encode_hello_body(body: &HelloBody) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.groups.len() * 8);
    out.extend_from_slice(&0u16.to_be_bytes());
    out.push(encode_time(body.htime_seconds));
    out.push(body.willingness);

    for group in &body.groups {
        let lm_size = 4 + group.addrs.len() * 4;
        out.push(group.link_code);
        out.push(0);
        out.extend_from_slice(&(lm_size as u16).to_be_bytes());
        for addr in &group.addrs {
            out.extend_from_slice(&addr.octets());
        }
    }
    out
}

/// Parse a HELLO body, tolerating truncated trailing link messages: a link
/// message whose declared size runs past the buffer yields whatever whole
/// addresses fit, and parsing stops there.
pub fn parse_hello_body(data: &[u8]) -> Option<HelloBody> {
    if data.len() < 4 {
        return None;
    }
    let htime_byte = data[2];
    let willingness = data[3];
    let htime_seconds = decode_time(htime_byte);

    let mut groups = Vec::new();
    let mut cursor = 4usize;

    while data.len() - cursor >= 4 {
        let link_code = data[cursor];
        let lm_size = u16::from_be_bytes([data[cursor + 2], data[cursor + 3]]) as usize;
        if lm_size < 4 {
            break;
        }

        let end_of_lm = (cursor + lm_size).min(data.len());
        let mut addrs = Vec::new();
        let mut ip_cursor = cursor + 4;
        while ip_cursor + 4 <= end_of_lm {
            addrs.push(Ipv4Addr::new(
                data[ip_cursor],
                data[ip_cursor + 1],
                data[ip_cursor + 2],
                data[ip_cursor + 3],
            ));
            ip_cursor += 4;
        }
        groups.push(LinkGroup { link_code, addrs });

        cursor += lm_size;
        if cursor > data.len() {
            break;
        }
    }

    Some(HelloBody {
        htime_seconds,
        willingness,
        groups,
    })
}
