//! The pairing table: sender connections parked under a 4-digit pair code,
//! waiting for a receiver to claim them.
//!
//! A code is reserved synchronously (so it can be written into the upgrade
//! response header before the websocket handshake itself completes) and
//! filled in moments later once axum hands back the live socket.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::ws::WebSocket;
use peerhop_core::envelope::ClientInfo;
use rand_core::RngCore;

pub const PAIR_CODE_TTL: Duration = Duration::from_secs(120);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

pub struct PendingSender {
    pub info: ClientInfo,
    pub socket: WebSocket,
    pub created_at: Instant,
}

struct Slot {
    created_at: Instant,
    sender: Option<PendingSender>,
}

pub struct RelayState {
    pending: Mutex<HashMap<String, Slot>>,
    ttl: Duration,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::with_ttl(PAIR_CODE_TTL)
    }
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct with a non-default TTL. Used by tests that need to exercise
    /// expiry without waiting out the real 120-second window.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Allocate a 4-digit pair code not already in use and reserve it.
    /// The reservation itself starts the code's TTL clock.
    pub fn reserve_code(&self) -> String {
        let mut pending = self.pending.lock().expect("pairing table mutex poisoned");
        let code = loop {
            let candidate = random_pair_code();
            if !pending.contains_key(&candidate) {
                break candidate;
            }
        };
        pending.insert(
            code.clone(),
            Slot {
                created_at: Instant::now(),
                sender: None,
            },
        );
        code
    }

    /// Fill a reservation with the live sender socket once the websocket
    /// upgrade completes.
    pub fn finalize_sender(&self, code: &str, info: ClientInfo, socket: WebSocket) {
        let mut pending = self.pending.lock().expect("pairing table mutex poisoned");
        if let Some(slot) = pending.get_mut(code) {
            slot.sender = Some(PendingSender {
                info,
                socket,
                created_at: slot.created_at,
            });
        }
    }

    /// Remove and return the sender parked under `code`, if it has finished
    /// its upgrade. A receiver claiming a code consumes it — it cannot be
    /// reused. Returns `None` both for an unknown code and for one whose
    /// sender upgrade hasn't completed yet.
    pub fn take_sender(&self, code: &str) -> Option<PendingSender> {
        let mut pending = self.pending.lock().expect("pairing table mutex poisoned");
        match pending.get(code) {
            Some(Slot { sender: Some(_), .. }) => pending.remove(code).and_then(|s| s.sender),
            _ => None,
        }
    }

    /// Drop a reservation or parked sender without inspecting it, e.g. when
    /// the sender's own websocket upgrade never completes.
    pub fn remove_sender(&self, code: &str) {
        self.pending.lock().expect("pairing table mutex poisoned").remove(code);
    }

    #[cfg(test)]
    fn contains(&self, code: &str) -> bool {
        self.pending.lock().expect("pairing table mutex poisoned").contains_key(code)
    }

    /// Drain entries older than [`PAIR_CODE_TTL`]. Called on [`SWEEP_INTERVAL`].
    /// Bare reservations whose upgrade never completed are dropped silently.
    pub fn sweep_expired(&self) -> Vec<PendingSender> {
        let mut pending = self.pending.lock().expect("pairing table mutex poisoned");
        let now = Instant::now();
        let expired: Vec<String> = pending
            .iter()
            .filter(|(_, slot)| now.duration_since(slot.created_at) >= self.ttl)
            .map(|(code, _)| code.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|code| pending.remove(&code))
            .filter_map(|slot| slot.sender)
            .collect()
    }
}

fn random_pair_code() -> String {
    let n = rand_core::OsRng.next_u32() % 10_000;
    format!("{n:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_code_is_always_four_digits() {
        for _ in 0..50 {
            let code = random_pair_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn unfinalized_reservation_is_not_claimable() {
        let state = RelayState::new();
        let code = state.reserve_code();
        assert!(state.take_sender(&code).is_none());
    }

    #[test]
    fn reserved_codes_are_unique_in_practice() {
        let state = RelayState::new();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..20 {
            assert!(codes.insert(state.reserve_code()));
        }
    }

    #[test]
    fn sweep_evicts_entries_past_their_ttl_but_spares_fresh_ones() {
        let state = RelayState::with_ttl(Duration::from_millis(20));
        let stale_code = state.reserve_code();
        std::thread::sleep(Duration::from_millis(40));
        let fresh_code = state.reserve_code();

        let evicted = state.sweep_expired();

        // Never finalized with a socket, so nothing comes back from the
        // sweep, but the stale row itself must be gone from the table.
        assert!(evicted.is_empty());
        assert!(!state.contains(&stale_code));
        assert!(state.contains(&fresh_code));
    }
}
