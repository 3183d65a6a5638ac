//! Endpoint derivation.
//!
//! Builds the simulated endpoints for a run. Derivation is a pure function of
//! its inputs so the same parameters always produce the same load pattern.

use crate::config::ConfigError;
use radacct_types::{Endpoint, HardwareAddress, MIN_SESSION_COUNT};
use std::net::Ipv4Addr;
use tracing::info;

/// Hardware address of endpoint 0 (`a00000000001`).
pub const BASE_HARDWARE_ADDRESS: u64 = 0xa0_00_00_00_00_01;

/// Network address of endpoint 0.
pub const BASE_NETWORK_ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// Input octets per session of endpoint 0; endpoint `i` adds `i`.
pub const BASE_BYTES_IN: u64 = 1000;

/// Output octets per session of endpoint 0; endpoint `i` adds `i`.
pub const BASE_BYTES_OUT: u64 = 2000;

/// Derive `count` endpoints.
///
/// Endpoint `i` gets `min_interim + (i % max_interim) + 2` sessions, so every
/// endpoint has at least a Start and a Stop. Addresses are the base addresses
/// offset by `i`.
///
/// # Errors
///
/// - [`ConfigError::ZeroMaxInterim`] if `max_interim` is 0
/// - [`ConfigError::AddressSpaceExhausted`] if `count` endpoints would run
///   past the last hardware or IPv4 address
pub fn derive_endpoints(
    count: usize,
    min_interim: u32,
    max_interim: u32,
) -> Result<Vec<Endpoint>, ConfigError> {
    if max_interim == 0 {
        return Err(ConfigError::ZeroMaxInterim);
    }
    check_address_space(count)?;

    info!(count, min_interim, max_interim, "Deriving endpoints");

    let mut endpoints = Vec::with_capacity(count);
    for ordinal in 0..count {
        endpoints.push(derive_one(ordinal, min_interim, max_interim)?);
    }

    Ok(endpoints)
}

/// Total number of events a set of endpoints will emit.
pub fn total_events(endpoints: &[Endpoint]) -> u64 {
    endpoints.iter().map(|e| e.session_count() as u64).sum()
}

fn derive_one(ordinal: usize, min_interim: u32, max_interim: u32) -> Result<Endpoint, ConfigError> {
    let exhausted = || ConfigError::AddressSpaceExhausted { count: ordinal + 1 };

    let hardware_address = HardwareAddress::new(BASE_HARDWARE_ADDRESS)
        .and_then(|base| base.checked_add(ordinal as u64))
        .ok_or_else(exhausted)?;

    let network_address = u32::try_from(ordinal)
        .ok()
        .and_then(|offset| u32::from(BASE_NETWORK_ADDRESS).checked_add(offset))
        .map(Ipv4Addr::from)
        .ok_or_else(exhausted)?;

    // `ordinal % max_interim` is below max_interim, so it fits in u32.
    let extra = (ordinal % max_interim as usize) as u32;
    let session_count = min_interim
        .checked_add(extra)
        .and_then(|n| n.checked_add(MIN_SESSION_COUNT))
        .ok_or(ConfigError::SessionCountOverflow { ordinal })?;

    let endpoint = Endpoint::new(
        hardware_address,
        network_address,
        BASE_BYTES_IN + ordinal as u64,
        BASE_BYTES_OUT + ordinal as u64,
        session_count,
    )?;

    Ok(endpoint)
}

fn check_address_space(count: usize) -> Result<(), ConfigError> {
    let Some(last) = count.checked_sub(1) else {
        return Ok(());
    };
    let last = last as u64;

    let mac_room = HardwareAddress::MAX - BASE_HARDWARE_ADDRESS;
    let ip_room = (u32::MAX - u32::from(BASE_NETWORK_ADDRESS)) as u64;
    if last > mac_room || last > ip_room {
        return Err(ConfigError::AddressSpaceExhausted { count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_count_formula() {
        let endpoints = derive_endpoints(45, 0, 20).unwrap();

        assert_eq!(endpoints[0].session_count(), 2);
        assert_eq!(endpoints[1].session_count(), 3);
        assert_eq!(endpoints[19].session_count(), 21);
        assert_eq!(endpoints[20].session_count(), 2);
        assert_eq!(endpoints[44].session_count(), 6);

        for (i, endpoint) in endpoints.iter().enumerate() {
            assert_eq!(endpoint.session_count(), (i % 20) as u32 + 2);
        }
    }

    #[test]
    fn test_min_interim_shifts_all_counts() {
        let endpoints = derive_endpoints(4, 3, 2).unwrap();
        let counts: Vec<u32> = endpoints.iter().map(|e| e.session_count()).collect();
        assert_eq!(counts, vec![5, 6, 5, 6]);
    }

    #[test]
    fn test_addresses_are_sequential() {
        let endpoints = derive_endpoints(3, 0, 20).unwrap();

        assert_eq!(endpoints[0].hardware_address().to_string(), "a00000000001");
        assert_eq!(endpoints[1].hardware_address().to_string(), "a00000000002");
        assert_eq!(endpoints[2].hardware_address().to_string(), "a00000000003");

        assert_eq!(endpoints[0].network_address(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(endpoints[2].network_address(), Ipv4Addr::new(10, 0, 0, 3));

        assert_eq!(endpoints[2].bytes_in_per_session(), 1002);
        assert_eq!(endpoints[2].bytes_out_per_session(), 2002);
    }

    #[test]
    fn test_network_address_carries_into_next_octet() {
        let endpoints = derive_endpoints(256, 0, 20).unwrap();
        assert_eq!(endpoints[254].network_address(), Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(endpoints[255].network_address(), Ipv4Addr::new(10, 0, 1, 0));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            derive_endpoints(50, 1, 7).unwrap(),
            derive_endpoints(50, 1, 7).unwrap()
        );
    }

    #[test]
    fn test_zero_max_interim_rejected() {
        assert!(matches!(
            derive_endpoints(10, 0, 0),
            Err(ConfigError::ZeroMaxInterim)
        ));
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(derive_endpoints(0, 0, 20).unwrap().is_empty());
    }

    #[test]
    fn test_address_space_overflow_rejected() {
        // 10.0.0.1 leaves room for 2^32 - 167772161 addresses.
        let room = (u32::MAX - u32::from(BASE_NETWORK_ADDRESS)) as usize + 1;
        assert!(check_address_space(room).is_ok());
        assert!(matches!(
            check_address_space(room + 1),
            Err(ConfigError::AddressSpaceExhausted { .. })
        ));
    }

    #[test]
    fn test_session_count_overflow_rejected() {
        assert!(matches!(
            derive_endpoints(2, u32::MAX - 2, 5),
            Err(ConfigError::SessionCountOverflow { ordinal: 1 })
        ));
    }

    #[test]
    fn test_total_events() {
        let endpoints = derive_endpoints(3, 0, 20).unwrap();
        assert_eq!(total_events(&endpoints), 2 + 3 + 4);
    }
}
