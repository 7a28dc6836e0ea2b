//! The pairing predicate.
//!
//! Decides whether two players may be paired for a given interaction kind,
//! given each side's matching parameters and the kind's tolerance table.
//! Kind-specific gates (invadability, visitor pools, feature toggles) are
//! applied by the handlers before consulting this.

use emberward_game::GameVariant;
use emberward_protocol::messages::MatchingParameter;

use crate::config::MatchingTable;

/// The level inputs the predicate compares. Soul-memory variants substitute
/// memory for level.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MatchingInput {
    pub level: u64,
    pub weapon_level: u32,
}

impl MatchingInput {
    pub fn from_parameter(params: &MatchingParameter, variant: &dyn GameVariant) -> Self {
        let level = if variant.matches_on_soul_memory() {
            params.soul_memory.unwrap_or(0)
        } else {
            u64::from(params.soul_level)
        };
        Self {
            level,
            weapon_level: params.max_weapon_level,
        }
    }

    pub fn from_levels(level: u64, weapon_level: u32) -> Self {
        Self {
            level,
            weapon_level,
        }
    }
}

/// Highest weapon level `own` may be matched against under `table`.
fn weapon_upper_bound(table: &MatchingTable, own: u32) -> u32 {
    match table.weapon_level_upper.last() {
        Some(&last) => *table
            .weapon_level_upper
            .get(own as usize)
            .unwrap_or(&last),
        None => u32::MAX,
    }
}

/// Core tolerance check. Total on all finite inputs, and symmetric because
/// the weapon bound is applied from both sides and the level window is only
/// asymmetric if the table says so.
pub fn can_match(
    table: &MatchingTable,
    host: MatchingInput,
    candidate: MatchingInput,
    password_present: bool,
    weapon_check_enabled: bool,
) -> bool {
    if table.ignore_when_password && password_present {
        return true;
    }

    if weapon_check_enabled {
        if candidate.weapon_level > weapon_upper_bound(table, host.weapon_level) {
            return false;
        }
        if host.weapon_level > weapon_upper_bound(table, candidate.weapon_level) {
            return false;
        }
    }

    let mut lower = host.level.saturating_sub(table.soul_range_down);
    let mut upper = host.level.saturating_add(table.soul_range_up);

    if table.soul_pct > 0.0 {
        let pct = (host.level as f64 * f64::from(table.soul_pct) / 100.0) as u64;
        lower = lower.max(host.level.saturating_sub(pct));
        upper = upper.min(host.level.saturating_add(pct));
    }

    (lower..=upper).contains(&candidate.level)
}

/// Full parameter check as the handlers use it: exact password equality
/// first, then the tolerance table with the password flag derived from the
/// host's parameters.
pub fn can_match_params(
    table: &MatchingTable,
    host: &MatchingParameter,
    candidate: &MatchingParameter,
    variant: &dyn GameVariant,
    weapon_check_enabled: bool,
) -> bool {
    if host.password != candidate.password {
        return false;
    }

    can_match(
        table,
        MatchingInput::from_parameter(host, variant),
        MatchingInput::from_parameter(candidate, variant),
        !host.password.is_empty(),
        weapon_check_enabled,
    )
}

#[cfg(test)]
mod tests {
    use emberward_game::AshenVariant;

    use super::*;

    fn table() -> MatchingTable {
        MatchingTable {
            soul_range_up: 10,
            soul_range_down: 10,
            soul_pct: 0.0,
            weapon_level_upper: vec![1, 2, 3, 4, 6, 7, 8, 9, 10, 10, 10],
            ignore_when_password: true,
        }
    }

    fn input(level: u64, weapon: u32) -> MatchingInput {
        MatchingInput::from_levels(level, weapon)
    }

    #[test]
    fn level_window_admits_and_refuses() {
        let t = table();
        assert!(can_match(&t, input(50, 5), input(55, 6), false, true));
        assert!(can_match(&t, input(50, 5), input(40, 5), false, true));
        assert!(!can_match(&t, input(50, 5), input(61, 5), false, true));
        assert!(!can_match(&t, input(50, 5), input(39, 5), false, true));
    }

    #[test]
    fn weapon_bound_applies_both_ways() {
        let t = table();
        // A level-5 weapon matches up to 6; a level-10 weapon only down to
        // players whose own bound reaches 10.
        assert!(!can_match(&t, input(50, 5), input(50, 10), false, true));
        assert!(!can_match(&t, input(50, 10), input(50, 5), false, true));
        assert!(can_match(&t, input(50, 5), input(50, 6), false, true));
    }

    #[test]
    fn weapon_check_can_be_disabled() {
        let t = table();
        assert!(can_match(&t, input(50, 0), input(50, 10), false, false));
    }

    #[test]
    fn password_bypasses_when_table_allows() {
        let t = table();
        assert!(can_match(&t, input(1, 0), input(800, 10), true, true));

        let strict = MatchingTable {
            ignore_when_password: false,
            ..t
        };
        assert!(!can_match(&strict, input(1, 0), input(800, 10), true, true));
    }

    #[test]
    fn percentage_caps_the_window() {
        let t = MatchingTable {
            soul_range_up: 100,
            soul_range_down: 100,
            soul_pct: 10.0,
            ..table()
        };
        // At level 200 the cap is ±20.
        assert!(can_match(&t, input(200, 5), input(220, 5), false, false));
        assert!(!can_match(&t, input(200, 5), input(221, 5), false, false));
    }

    #[test]
    fn symmetry_with_symmetric_table() {
        let t = table();
        for (a, b) in [(50u64, 58u64), (50, 61), (10, 12), (1, 800)] {
            assert_eq!(
                can_match(&t, input(a, 5), input(b, 5), false, true),
                can_match(&t, input(b, 5), input(a, 5), false, true),
                "asymmetric for levels {a} and {b}"
            );
        }
    }

    #[test]
    fn params_require_equal_passwords() {
        let variant = AshenVariant::new();
        let t = table();

        let mut host = MatchingParameter {
            soul_level: 50,
            max_weapon_level: 5,
            password: "ember".into(),
            ..Default::default()
        };
        let mut candidate = host.clone();
        assert!(can_match_params(&t, &host, &candidate, &variant, true));

        candidate.password = "other".into();
        assert!(!can_match_params(&t, &host, &candidate, &variant, true));

        // No passwords at all falls through to the tables.
        host.password.clear();
        candidate.password.clear();
        candidate.soul_level = 500;
        assert!(!can_match_params(&t, &host, &candidate, &variant, true));
    }

    #[test]
    fn soul_memory_variant_compares_memory() {
        let variant = emberward_game::SunkenVariant::new();
        let t = table();

        let host = MatchingParameter {
            soul_level: 1,
            soul_memory: Some(1_000_000),
            max_weapon_level: 5,
            ..Default::default()
        };
        let near = MatchingParameter {
            soul_level: 800,
            soul_memory: Some(1_000_005),
            max_weapon_level: 5,
            ..Default::default()
        };
        assert!(can_match_params(&t, &host, &near, &variant, true));

        let far = MatchingParameter {
            soul_memory: Some(2_000_000),
            max_weapon_level: 5,
            ..near.clone()
        };
        assert!(!can_match_params(&t, &host, &far, &variant, true));
    }
}
