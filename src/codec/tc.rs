//! TC (Topology Control) message body (RFC 3626 Section 9.1): ansn(2) +
//! reserved(2), followed by a flat run of advertised-neighbor IPv4 addresses.

use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcBody {
    pub ansn: u16,
    pub advertised_neighbors: Vec<Ipv4Addr>,
}

pub fn encode_tc_body(body: &TcBody) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.advertised_neighbors.len() * 4);
    out.extend_from_slice(&body.ansn.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    for addr in &body.advertised_neighbors {
        out.extend_from_slice(&addr.octets());
    }
    out
}

/// Parse a TC body, stopping after the last whole 4-byte address that fits.
pub fn parse_tc_body(data: &[u8]) -> Option<TcBody> {
    if data.len() < 4 {
        return None;
    }
    let ansn = u16::from_be_bytes([data[0], data[1]]);

    let mut advertised_neighbors = Vec::new();
    let mut cursor = 4usize;
    while cursor + 4 <= data.len() {
        advertised_neighbors.push(Ipv4Addr::new(
            data[cursor],
            data[cursor + 1],
            data[cursor + 2],
            data[cursor + 3],
        ));
        cursor += 4;
    }

    Some(TcBody {
        ansn,
        advertised_neighbors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let body = TcBody {
            ansn: 42,
            advertised_neighbors: vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)],
        };
        let encoded = encode_tc_body(&body);
        assert_eq!(parse_tc_body(&encoded), Some(body));
    }

    #[test]
    fn truncated_trailing_bytes_are_dropped() {
        let body = TcBody {
            ansn: 7,
            advertised_neighbors: vec![Ipv4Addr::new(1, 2, 3, 4)],
        };
        let mut encoded = encode_tc_body(&body);
        encoded.extend_from_slice(&[9, 9]);
        let decoded = parse_tc_body(&encoded).unwrap();
        assert_eq!(decoded.advertised_neighbors.len(), 1);
    }

    #[test]
    fn too_short_returns_none() {
        assert_eq!(parse_tc_body(&[0, 1, 2]), None);
    }
}
