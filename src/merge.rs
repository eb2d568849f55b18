//! Ordered-overlay merge of provider updates onto a token's current snapshot

use chrono::{DateTime, Utc};

use crate::types::{ProviderUpdate, TokenSnapshot};

/// Overlays `updates` onto `original` in iteration order and stamps the
/// result with `observed_at`.
///
/// Precedence is positional: a later update wins field-by-field over an
/// earlier one, and any field no update reported carries the original's
/// value forward. The token address is never changed by a merge, and the
/// result is always stamped even when every update was empty.
pub fn merge_snapshot<'a, I>(
    original: &TokenSnapshot,
    updates: I,
    observed_at: DateTime<Utc>,
) -> TokenSnapshot
where
    I: IntoIterator<Item = &'a ProviderUpdate>,
{
    let mut merged = original.clone();

    for update in updates {
        if update.name.is_some() {
            merged.name = update.name.clone();
        }
        if update.symbol.is_some() {
            merged.symbol = update.symbol.clone();
        }
        if update.market_cap.is_some() {
            merged.market_cap = update.market_cap.clone();
        }
        if update.holders.is_some() {
            merged.holders = update.holders.clone();
        }
        if update.risk_score.is_some() {
            merged.risk_score = update.risk_score.clone();
        }
        if update.honeypot.is_some() {
            merged.honeypot = update.honeypot;
        }
        if update.lp_locked.is_some() {
            merged.lp_locked = update.lp_locked;
        }
        if update.top_holders.is_some() {
            merged.top_holders = update.top_holders.clone();
        }
    }

    merged.observed_at = observed_at;
    merged
}
