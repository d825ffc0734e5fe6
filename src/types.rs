use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateView {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "directionRad")]
    pub direction_rad: f64,
    pub score: f64,
    pub boosting: bool,
    pub body: Vec<Vec2>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub name: String,
    pub score: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinimapCell {
    pub x: i64,
    pub y: i64,
    pub value: f64,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinimapPlayer {
    pub id: String,
    pub name: String,
    pub score: i64,
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinimapView {
    #[serde(rename = "generatedAtMs")]
    pub generated_at_ms: u64,
    pub cells: Vec<MinimapCell>,
    pub players: Vec<MinimapPlayer>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeMultipliers {
    #[serde(rename = "bodyRadius")]
    pub body_radius: f64,
    #[serde(rename = "bodyLength")]
    pub body_length: f64,
}

/// The per-recipient payload of a `state` frame. Everything a client may
/// see this tick and nothing more.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(rename = "serverNow")]
    pub server_now: u64,
    pub foods: Vec<FoodView>,
    pub players: Vec<PlayerStateView>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub minimap: MinimapView,
    pub multipliers: SizeMultipliers,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomSummary {
    pub id: String,
    #[serde(rename = "playerCount")]
    pub player_count: usize,
    #[serde(rename = "foodCount")]
    pub food_count: usize,
    #[serde(rename = "maxPlayers")]
    pub max_players: usize,
    pub closed: bool,
    #[serde(rename = "emptySinceMs")]
    pub empty_since_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerAdminView {
    pub id: String,
    pub name: String,
    pub score: i64,
    pub x: i64,
    pub y: i64,
    #[serde(rename = "bodyPoints")]
    pub body_points: usize,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomTickStats {
    pub samples: usize,
    #[serde(rename = "avgMs")]
    pub avg_ms: f64,
    #[serde(rename = "p95Ms")]
    pub p95_ms: f64,
    #[serde(rename = "maxMs")]
    pub max_ms: f64,
}
