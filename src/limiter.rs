//! Per-host, per-minute budget for remote-command attempts.
//!
//! Rollover is lazy: the counter resets whenever the current wall-clock
//! minute differs from the persisted window key. No background timer.

use chrono::{DateTime, Local};

use crate::state::HostState;

/// Maximum remote-command attempts per host per wall-clock minute.
pub const MAX_ATTEMPTS_PER_MINUTE: u32 = 3;

/// Format a wall-clock instant as a minute bucket key (`YYYYMMDDHHmm`).
pub fn window_key(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M").to_string()
}

/// Whether another remote-command attempt fits in the current minute.
///
/// Rolls the window over first when the wall-clock minute has changed.
/// Callers must consult this before every remote-command invocation; the
/// connectivity probe and each evidence command are separate invocations.
pub fn can_probe(state: &mut HostState) -> bool {
    can_probe_at(state, &window_key(Local::now()))
}

/// [`can_probe`] with an explicit window key, for deterministic tests.
pub fn can_probe_at(state: &mut HostState, key: &str) -> bool {
    if state.rate_window_key != key {
        state.rate_window_key = key.to_owned();
        state.attempts_this_window = 0;
    }
    state.attempts_this_window < MAX_ATTEMPTS_PER_MINUTE
}

/// Record one remote-command attempt against the current window.
///
/// Must be called for every attempted invocation, including ones that
/// end up failing or timing out.
pub fn record_attempt(state: &mut HostState) {
    state.attempts_this_window = state.attempts_this_window.saturating_add(1);
}
