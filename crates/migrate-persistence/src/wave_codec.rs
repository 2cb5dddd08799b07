//! `WavePhase` has no `Display`/`FromStr` of its own (it round-trips
//! through serde's `snake_case` tag everywhere else); these two functions
//! give the `pg` module the same encoding for TEXT columns.

use migrate_core::model::WavePhase;

pub fn wave_to_text(wave: WavePhase) -> &'static str {
    match wave {
        WavePhase::Plan => "plan",
        WavePhase::Expand => "expand",
        WavePhase::Backfill => "backfill",
        WavePhase::Validate => "validate",
        WavePhase::Contract => "contract",
    }
}

pub fn wave_from_text(text: &str) -> Option<WavePhase> {
    match text {
        "plan" => Some(WavePhase::Plan),
        "expand" => Some(WavePhase::Expand),
        "backfill" => Some(WavePhase::Backfill),
        "validate" => Some(WavePhase::Validate),
        "contract" => Some(WavePhase::Contract),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_phase() {
        for phase in WavePhase::CANONICAL_ORDER {
            assert_eq!(wave_from_text(wave_to_text(phase)), Some(phase));
        }
    }
}
