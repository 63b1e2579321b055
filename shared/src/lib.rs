use serde::{Deserialize, Serialize};

pub const STARTING_GOLD: i32 = 500;
pub const STARTING_HEALTH: i32 = 100;
pub const ENEMY_DAMAGE: i32 = 5;
pub const ENEMY_REWARD: i32 = 25;
pub const SPAWN_STAGGER_MS: u64 = 1000;
pub const WAYPOINT_RADIUS: f32 = 5.0;
/// Enemy speed is expressed in units per reference frame of this length.
pub const FRAME_MS: f32 = 16.0;
pub const DEFAULT_GAME_ID: &str = "default";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Waypoints every enemy walks, in order. Clients draw the same polyline;
/// it is never sent over the wire.
pub const ENEMY_PATH: [Point; 8] = [
    Point::new(0.0, 300.0),
    Point::new(200.0, 300.0),
    Point::new(200.0, 100.0),
    Point::new(400.0, 100.0),
    Point::new(400.0, 400.0),
    Point::new(600.0, 400.0),
    Point::new(600.0, 200.0),
    Point::new(800.0, 200.0),
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TowerKind {
    Basic,
    Fast,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerStats {
    pub cost: i32,
    pub damage: i32,
    pub range: f32,
    /// Minimum time between two shots, in milliseconds.
    pub fire_rate: u64,
}

impl TowerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(TowerKind::Basic),
            "fast" => Some(TowerKind::Fast),
            "strong" => Some(TowerKind::Strong),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TowerKind::Basic => "basic",
            TowerKind::Fast => "fast",
            TowerKind::Strong => "strong",
        }
    }

    pub fn stats(&self) -> TowerStats {
        match self {
            TowerKind::Basic => TowerStats {
                cost: 100,
                damage: 15,
                range: 100.0,
                fire_rate: 800,
            },
            TowerKind::Fast => TowerStats {
                cost: 150,
                damage: 10,
                range: 100.0,
                fire_rate: 300,
            },
            TowerKind::Strong => TowerStats {
                cost: 200,
                damage: 30,
                range: 120.0,
                fire_rate: 1500,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerState {
    pub id: String,
    pub name: String,
    pub ready: bool,
}

impl PlayerState {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            ready: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TowerState {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type")]
    pub kind: TowerKind,
    pub player_id: String,
    pub damage: i32,
    pub range: f32,
    pub fire_rate: u64,
    /// `None` until the tower has fired once.
    pub last_fire: Option<u64>,
}

impl TowerState {
    pub fn new(id: u64, x: f32, y: f32, kind: TowerKind, player_id: String) -> Self {
        let stats = kind.stats();
        Self {
            id,
            x,
            y,
            kind,
            player_id,
            damage: stats.damage,
            range: stats.range,
            fire_rate: stats.fire_rate,
            last_fire: None,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn can_fire(&self, now: u64) -> bool {
        match self.last_fire {
            Some(last) => now.saturating_sub(last) >= self.fire_rate,
            None => true,
        }
    }

    pub fn in_range(&self, enemy: &EnemyState) -> bool {
        self.position().distance(&enemy.position()) <= self.range
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnemyState {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub path_index: usize,
    pub health: i32,
    pub max_health: i32,
    pub speed: f32,
    pub damage: i32,
    pub reward: i32,
}

impl EnemyState {
    /// Creates an enemy at the path entrance, scaled for the given wave.
    pub fn spawn(id: u64, wave: u32) -> Self {
        let start = ENEMY_PATH[0];
        let health = wave_health(wave);
        Self {
            id,
            x: start.x,
            y: start.y,
            path_index: 0,
            health,
            max_health: health,
            speed: wave_speed(wave),
            damage: ENEMY_DAMAGE,
            reward: ENEMY_REWARD,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

pub fn wave_enemy_count(wave: u32) -> u32 {
    5 + wave * 2
}

pub fn wave_health(wave: u32) -> i32 {
    50 + wave as i32 * 10
}

pub fn wave_speed(wave: u32) -> f32 {
    1.0 + wave as f32 * 0.1
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: Vec<PlayerState>,
    pub towers: Vec<TowerState>,
    pub enemies: Vec<EnemyState>,
    pub wave: u32,
    pub health: i32,
    pub gold: i32,
    pub game_started: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
}

/// Intents sent by clients, tagged by `type`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "playerName", default)]
        player_name: String,
        #[serde(rename = "gameId", default)]
        game_id: Option<String>,
    },
    Ready,
    PlaceTower {
        x: f32,
        y: f32,
        /// Kept as text so an unknown kind is a rejected placement
        /// rather than an undecodable message.
        #[serde(rename = "towerType")]
        tower_type: String,
    },
    StartWave,
}

impl ClientMessage {
    pub const KINDS: [&'static str; 4] = ["join", "ready", "placeTower", "startWave"];
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Joined {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "gameState")]
        game_state: GameState,
    },
    PlayerJoined {
        player: PlayerSummary,
    },
    GameState {
        state: GameState,
    },
    GameStarted,
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: String,
    },
}
