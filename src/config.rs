use serde::{Deserialize, Serialize};

/// Effective per-room configuration. New rooms are stamped from the
/// process-wide default; existing rooms are only changed by an explicit
/// admin patch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomConfig {
    #[serde(rename = "mapSize")]
    pub map_size: f64,
    #[serde(rename = "maxPlayers")]
    pub max_players: usize,
    #[serde(rename = "foodCoveragePercent")]
    pub food_coverage_percent: f64,
    #[serde(rename = "foodSpawnRatePerSecond")]
    pub food_spawn_rate_per_second: f64,
    #[serde(rename = "emptyRoomTtlSeconds")]
    pub empty_room_ttl_seconds: u64,
    #[serde(rename = "suctionRadiusMultiplier")]
    pub suction_radius_multiplier: f64,
    #[serde(rename = "suctionStrengthMultiplier")]
    pub suction_strength_multiplier: f64,
    #[serde(rename = "foodValueMultiplier")]
    pub food_value_multiplier: f64,
    #[serde(rename = "foodNearPlayerTarget")]
    pub food_near_player_target: usize,
    #[serde(rename = "bodyRadiusMultiplier")]
    pub body_radius_multiplier: f64,
    #[serde(rename = "bodyLengthMultiplier")]
    pub body_length_multiplier: f64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            map_size: 5_000.0,
            max_players: 60,
            food_coverage_percent: 10.0,
            food_spawn_rate_per_second: 120.0,
            empty_room_ttl_seconds: 300,
            suction_radius_multiplier: 1.0,
            suction_strength_multiplier: 1.0,
            food_value_multiplier: 1.0,
            food_near_player_target: 80,
            body_radius_multiplier: 1.0,
            body_length_multiplier: 1.0,
        }
    }
}

/// Partial configuration as sent by the admin plane; absent keys keep the
/// base value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoomConfigPatch {
    #[serde(rename = "mapSize")]
    pub map_size: Option<f64>,
    #[serde(rename = "maxPlayers")]
    pub max_players: Option<i64>,
    #[serde(rename = "foodCoveragePercent")]
    pub food_coverage_percent: Option<f64>,
    #[serde(rename = "foodSpawnRatePerSecond")]
    pub food_spawn_rate_per_second: Option<f64>,
    #[serde(rename = "emptyRoomTtlSeconds")]
    pub empty_room_ttl_seconds: Option<i64>,
    #[serde(rename = "suctionRadiusMultiplier")]
    pub suction_radius_multiplier: Option<f64>,
    #[serde(rename = "suctionStrengthMultiplier")]
    pub suction_strength_multiplier: Option<f64>,
    #[serde(rename = "foodValueMultiplier")]
    pub food_value_multiplier: Option<f64>,
    #[serde(rename = "foodNearPlayerTarget")]
    pub food_near_player_target: Option<i64>,
    #[serde(rename = "bodyRadiusMultiplier")]
    pub body_radius_multiplier: Option<f64>,
    #[serde(rename = "bodyLengthMultiplier")]
    pub body_length_multiplier: Option<f64>,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid config fields: {}", fields.join(", "))]
pub struct ConfigValidationError {
    pub fields: Vec<String>,
}

impl RoomConfigPatch {
    /// Validates every supplied key against its accepted range and merges
    /// over `base`. Reports the complete list of offending fields rather
    /// than stopping at the first.
    pub fn apply(&self, base: &RoomConfig) -> Result<RoomConfig, ConfigValidationError> {
        let mut merged = base.clone();
        let mut invalid: Vec<String> = Vec::new();

        let mut check_f64 = |field: &str, value: Option<f64>, min: f64, max: f64, slot: &mut f64| {
            if let Some(value) = value {
                if value.is_finite() && (min..=max).contains(&value) {
                    *slot = value;
                } else {
                    invalid.push(field.to_string());
                }
            }
        };

        check_f64("mapSize", self.map_size, 1_000.0, 20_000.0, &mut merged.map_size);
        check_f64(
            "foodCoveragePercent",
            self.food_coverage_percent,
            0.0,
            50.0,
            &mut merged.food_coverage_percent,
        );
        check_f64(
            "foodSpawnRatePerSecond",
            self.food_spawn_rate_per_second,
            0.0,
            10_000.0,
            &mut merged.food_spawn_rate_per_second,
        );
        check_f64(
            "suctionRadiusMultiplier",
            self.suction_radius_multiplier,
            0.0,
            5.0,
            &mut merged.suction_radius_multiplier,
        );
        check_f64(
            "suctionStrengthMultiplier",
            self.suction_strength_multiplier,
            0.0,
            5.0,
            &mut merged.suction_strength_multiplier,
        );
        check_f64(
            "foodValueMultiplier",
            self.food_value_multiplier,
            0.0,
            10.0,
            &mut merged.food_value_multiplier,
        );
        check_f64(
            "bodyRadiusMultiplier",
            self.body_radius_multiplier,
            0.0,
            10.0,
            &mut merged.body_radius_multiplier,
        );
        check_f64(
            "bodyLengthMultiplier",
            self.body_length_multiplier,
            0.0,
            10.0,
            &mut merged.body_length_multiplier,
        );

        if let Some(value) = self.max_players {
            if (2..=500).contains(&value) {
                merged.max_players = value as usize;
            } else {
                invalid.push("maxPlayers".to_string());
            }
        }
        if let Some(value) = self.empty_room_ttl_seconds {
            if (0..=3_600).contains(&value) {
                merged.empty_room_ttl_seconds = value as u64;
            } else {
                invalid.push("emptyRoomTtlSeconds".to_string());
            }
        }
        if let Some(value) = self.food_near_player_target {
            if (0..=400).contains(&value) {
                merged.food_near_player_target = value as usize;
            } else {
                invalid.push("foodNearPlayerTarget".to_string());
            }
        }

        if invalid.is_empty() {
            Ok(merged)
        } else {
            Err(ConfigValidationError { fields: invalid })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_keeps_defaults() {
        let base = RoomConfig::default();
        let merged = RoomConfigPatch::default().apply(&base).expect("empty patch is valid");
        assert_eq!(merged, base);
    }

    #[test]
    fn patch_overrides_only_supplied_keys() {
        let base = RoomConfig::default();
        let patch = RoomConfigPatch {
            map_size: Some(8_000.0),
            max_players: Some(12),
            ..RoomConfigPatch::default()
        };
        let merged = patch.apply(&base).expect("patch is valid");
        assert_eq!(merged.map_size, 8_000.0);
        assert_eq!(merged.max_players, 12);
        assert_eq!(merged.food_near_player_target, base.food_near_player_target);
    }

    #[test]
    fn out_of_range_fields_are_all_reported() {
        let base = RoomConfig::default();
        let patch = RoomConfigPatch {
            map_size: Some(100.0),
            max_players: Some(1),
            food_coverage_percent: Some(80.0),
            ..RoomConfigPatch::default()
        };
        let err = patch.apply(&base).expect_err("patch must be rejected");
        assert_eq!(
            err.fields,
            vec!["mapSize", "foodCoveragePercent", "maxPlayers"]
        );
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let base = RoomConfig::default();
        let patch = RoomConfigPatch {
            suction_radius_multiplier: Some(f64::NAN),
            ..RoomConfigPatch::default()
        };
        let err = patch.apply(&base).expect_err("NaN must be rejected");
        assert_eq!(err.fields, vec!["suctionRadiusMultiplier"]);
    }

    #[test]
    fn rejected_patch_leaves_base_untouched() {
        let base = RoomConfig::default();
        let patch = RoomConfigPatch {
            max_players: Some(0),
            ..RoomConfigPatch::default()
        };
        assert!(patch.apply(&base).is_err());
        assert_eq!(base, RoomConfig::default());
    }

    #[test]
    fn zero_ttl_is_accepted_and_disables_gc() {
        let base = RoomConfig::default();
        let patch = RoomConfigPatch {
            empty_room_ttl_seconds: Some(0),
            ..RoomConfigPatch::default()
        };
        let merged = patch.apply(&base).expect("zero ttl is valid");
        assert_eq!(merged.empty_room_ttl_seconds, 0);
    }

    #[test]
    fn patch_deserializes_from_camel_case_json() {
        let patch: RoomConfigPatch =
            serde_json::from_str(r#"{"mapSize":2000,"foodNearPlayerTarget":40}"#)
                .expect("patch should deserialize");
        assert_eq!(patch.map_size, Some(2_000.0));
        assert_eq!(patch.food_near_player_target, Some(40));
        assert!(patch.max_players.is_none());
    }
}
