//! Domain-specific identifier types.

use std::fmt;

/// Hardware (MAC) address of a simulated endpoint.
///
/// Stored as the low 48 bits of a `u64`. Rendered as 12 lowercase hex digits
/// without separators, which is the form used for the Calling-Station-Id and
/// the session id suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HardwareAddress(u64);

impl HardwareAddress {
    /// Largest representable address (all 48 bits set).
    pub const MAX: u64 = 0xffff_ffff_ffff;

    /// Create an address, returning `None` if it does not fit in 48 bits.
    pub fn new(value: u64) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// Get the raw value.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Address `offset` positions after this one, if still in range.
    pub fn checked_add(self, offset: u64) -> Option<Self> {
        self.0.checked_add(offset).and_then(Self::new)
    }

    /// The six octets, most significant first.
    pub fn octets(&self) -> [u8; 6] {
        let bytes = self.0.to_be_bytes();
        [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

/// Index of a worker lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneId(pub usize);

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lane({})", self.0)
    }
}

/// One step of simulated time across all endpoints. Rounds start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Round(pub u32);

impl Round {
    /// The first round, in which every endpoint starts its session.
    pub const FIRST: Self = Round(1);

    /// Get the next round.
    pub fn next(self) -> Self {
        Round(self.0 + 1)
    }

    /// Get the raw value.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_address_display() {
        let mac = HardwareAddress::new(0xa0_00_00_00_00_01).unwrap();
        assert_eq!(mac.to_string(), "a00000000001");

        let small = HardwareAddress::new(0x2a).unwrap();
        assert_eq!(small.to_string(), "00000000002a");
    }

    #[test]
    fn test_hardware_address_range() {
        assert!(HardwareAddress::new(HardwareAddress::MAX).is_some());
        assert!(HardwareAddress::new(HardwareAddress::MAX + 1).is_none());

        let last = HardwareAddress::new(HardwareAddress::MAX).unwrap();
        assert_eq!(last.checked_add(0), Some(last));
        assert_eq!(last.checked_add(1), None);
    }

    #[test]
    fn test_hardware_address_octets() {
        let mac = HardwareAddress::new(0x11_22_33_44_55_66).unwrap();
        assert_eq!(mac.octets(), [0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    }

    #[test]
    fn test_round_next() {
        assert_eq!(Round::FIRST.next(), Round(2));
        assert_eq!(Round(7).get(), 7);
    }
}
