use crate::model::{Ms, DAY_MS, HOUR_MS};

pub const MIN_GUESTS: u32 = 1;
pub const MAX_GUESTS: u32 = 6;

/// A claim older than this is ignored by every reader.
pub const DEFAULT_CLAIM_TTL_MS: Ms = 10_000;
/// Delay before a successful attempt drops its claim.
pub const DEFAULT_CLAIM_GRACE_MS: Ms = 1_000;
/// Cancellation is refused once check-in is this close (or closer).
pub const CANCELLATION_CUTOFF_MS: Ms = 24 * HOUR_MS;
pub const DEFAULT_REAPER_INTERVAL_MS: Ms = 5_000;

pub const MAX_STAY_MS: Ms = 365 * DAY_MS;
pub const MAX_USER_ID_LEN: usize = 256;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

pub const MAX_ROOMS: usize = 10_000;
