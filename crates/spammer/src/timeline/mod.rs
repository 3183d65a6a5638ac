//! Session timeline generation.
//!
//! Walks the endpoints round by round and yields the accounting event each
//! endpoint emits in that round. Rounds are the outer loop, endpoint order the
//! inner one, so every endpoint's Start goes out before anyone's first
//! interim update.

use radacct_types::{AccountingEvent, Endpoint, Round, StatusKind};
use std::iter::FusedIterator;

/// The event `endpoint` emits in `round`, if any.
///
/// Round 1 is the Start, round `S` the Stop, everything between an
/// Interim-Update. Endpoints are silent after round `S`.
pub fn event_for_round(endpoint: &Endpoint, round: Round) -> Option<AccountingEvent> {
    let n = round.get();
    let sessions = endpoint.session_count();

    let status = if n == 0 || n > sessions {
        return None;
    } else if n == 1 {
        StatusKind::Start
    } else if n < sessions {
        StatusKind::InterimUpdate
    } else {
        StatusKind::Stop
    };

    Some(AccountingEvent {
        status,
        hardware_address: endpoint.hardware_address(),
        network_address: endpoint.network_address(),
        bytes_in: n as u64 * endpoint.bytes_in_per_session(),
        bytes_out: n as u64 * endpoint.bytes_out_per_session(),
        round,
    })
}

/// Lazy, finite iterator over every event of a run.
#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    endpoints: &'a [Endpoint],
    max_rounds: u32,
    round: Round,
    cursor: usize,
    remaining: u64,
    done: bool,
}

/// Build the timeline for `endpoints`.
pub fn generate(endpoints: &[Endpoint]) -> Timeline<'_> {
    Timeline::new(endpoints)
}

impl<'a> Timeline<'a> {
    pub fn new(endpoints: &'a [Endpoint]) -> Self {
        let max_rounds = endpoints
            .iter()
            .map(Endpoint::session_count)
            .max()
            .unwrap_or(0);
        let remaining = crate::endpoints::total_events(endpoints);

        Self {
            endpoints,
            max_rounds,
            round: Round::FIRST,
            cursor: 0,
            remaining,
            done: max_rounds == 0,
        }
    }

    /// Number of rounds the run spans (the largest session count).
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Events this timeline yields in total, including ones already taken.
    pub fn total_events(&self) -> u64 {
        crate::endpoints::total_events(self.endpoints)
    }
}

impl Iterator for Timeline<'_> {
    type Item = AccountingEvent;

    fn next(&mut self) -> Option<AccountingEvent> {
        while !self.done {
            while let Some(endpoint) = self.endpoints.get(self.cursor) {
                self.cursor += 1;
                if let Some(event) = event_for_round(endpoint, self.round) {
                    self.remaining -= 1;
                    return Some(event);
                }
            }
            self.cursor = 0;
            if self.round.get() >= self.max_rounds {
                self.done = true;
            } else {
                self.round = self.round.next();
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for Timeline<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use radacct_types::HardwareAddress;
    use std::net::Ipv4Addr;

    fn endpoint(ordinal: u8, sessions: u32) -> Endpoint {
        Endpoint::new(
            HardwareAddress::new(0xa0_00_00_00_00_01 + ordinal as u64).unwrap(),
            Ipv4Addr::new(10, 0, 0, 1 + ordinal),
            1000 + ordinal as u64,
            2000 + ordinal as u64,
            sessions,
        )
        .unwrap()
    }

    #[test]
    fn test_round_major_order() {
        let endpoints = vec![endpoint(0, 2), endpoint(1, 3), endpoint(2, 4)];
        let timeline = generate(&endpoints);
        assert_eq!(timeline.max_rounds(), 4);
        assert_eq!(timeline.total_events(), 9);

        let got: Vec<(u32, u8, StatusKind)> = timeline
            .map(|e| (e.round.get(), e.network_address.octets()[3], e.status))
            .collect();

        use StatusKind::*;
        assert_eq!(
            got,
            vec![
                (1, 1, Start),
                (1, 2, Start),
                (1, 3, Start),
                (2, 1, Stop),
                (2, 2, InterimUpdate),
                (2, 3, InterimUpdate),
                (3, 2, Stop),
                (3, 3, InterimUpdate),
                (4, 3, Stop),
            ]
        );
    }

    #[test]
    fn test_per_endpoint_shape() {
        for sessions in 2..=25 {
            let endpoints = vec![endpoint(7, sessions)];
            let events: Vec<_> = generate(&endpoints).collect();

            assert_eq!(events.len(), sessions as usize);
            assert_eq!(events[0].status, StatusKind::Start);
            assert_eq!(events[events.len() - 1].status, StatusKind::Stop);
            assert!(events[1..events.len() - 1]
                .iter()
                .all(|e| e.status == StatusKind::InterimUpdate));
        }
    }

    #[test]
    fn test_counters_scale_with_round() {
        let endpoints = vec![endpoint(0, 3)];
        let events: Vec<_> = generate(&endpoints).collect();

        for (i, event) in events.iter().enumerate() {
            let round = i as u64 + 1;
            assert_eq!(event.bytes_in, round * 1000);
            assert_eq!(event.bytes_out, round * 2000);
            assert_eq!(event.session_elapsed() as u64, round);
        }
    }

    #[test]
    fn test_two_sessions_is_start_and_stop() {
        let endpoints = vec![endpoint(0, 2)];
        let statuses: Vec<_> = generate(&endpoints).map(|e| e.status).collect();
        assert_eq!(statuses, vec![StatusKind::Start, StatusKind::Stop]);
    }

    #[test]
    fn test_no_endpoints_no_events() {
        let mut timeline = generate(&[]);
        assert_eq!(timeline.max_rounds(), 0);
        assert_eq!(timeline.next(), None);
        assert_eq!(timeline.next(), None);
    }

    #[test]
    fn test_silent_after_stop() {
        let e = endpoint(0, 3);
        assert!(event_for_round(&e, Round(3)).is_some());
        assert!(event_for_round(&e, Round(4)).is_none());
        assert!(event_for_round(&e, Round(0)).is_none());
    }

    #[test]
    fn test_size_hint_is_exact() {
        let endpoints = vec![endpoint(0, 2), endpoint(1, 5)];
        let mut timeline = generate(&endpoints);
        assert_eq!(timeline.size_hint(), (7, Some(7)));
        timeline.next();
        timeline.next();
        assert_eq!(timeline.size_hint(), (5, Some(5)));
        assert_eq!(timeline.count(), 5);
    }
}
