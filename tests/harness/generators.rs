// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

use registrar_admission::{Candidate, Identity};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of client identities from the 10.x.x.x range.
pub fn generate_ips(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            let ip = IpAddr::V4(Ipv4Addr::new(10, a, b, c));
            Identity::new(ip.to_string()).unwrap()
        })
        .collect()
}

/// Letters-only label for index `i` (`a`, `b`, ..., `ba`, ...).
pub fn label(mut i: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'a' + (i % 26) as u8);
        i /= 26;
        if i == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

/// Distinct, plausible-looking candidates.
pub fn generate_candidates(count: usize, tld: &str) -> Vec<Candidate> {
    (0..count)
        .map(|i| Candidate::new(format!("site-{}", label(i)), tld, "1.1.1.1"))
        .collect()
}

/// Candidates with repeated prefixes all pointing at one target, the shape
/// of a scripted spam run.
pub fn generate_spam_wave(count: usize, tld: &str) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            Candidate::new(
                format!("freecoins-{}", label(i)),
                tld,
                "https://spam.example.com/landing",
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_letters() {
        assert_eq!(label(0), "a");
        assert_eq!(label(25), "z");
        assert_eq!(label(26), "ba");
        assert!(label(1000).chars().all(|c| c.is_ascii_lowercase()));
    }
}
