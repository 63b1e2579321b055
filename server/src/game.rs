use log::{debug, info};
use shared::{
    wave_enemy_count, EnemyState, GameState, PlayerState, TowerKind, TowerState, ENEMY_PATH,
    FRAME_MS, SPAWN_STAGGER_MS, STARTING_GOLD, STARTING_HEALTH, WAYPOINT_RADIUS,
};
use std::collections::VecDeque;

/// An enemy waiting for its release time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSpawn {
    pub due: u64,
    pub wave: u32,
}

/// One game's authoritative state.
///
/// Everything in here is mutated either by a message handler acting for a
/// single connection or by the tick scheduler, never both at once.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub players: Vec<PlayerState>,
    pub towers: Vec<TowerState>,
    pub enemies: Vec<EnemyState>,
    pub wave: u32,
    pub started: bool,
    pub health: i32,
    pub gold: i32,
    pub last_tick: u64,
    pending_spawns: VecDeque<PendingSpawn>,
    next_tower_id: u64,
    next_enemy_id: u64,
}

impl Session {
    pub fn new(id: String, now: u64) -> Self {
        Self {
            id,
            players: Vec::new(),
            towers: Vec::new(),
            enemies: Vec::new(),
            wave: 0,
            started: false,
            health: STARTING_HEALTH,
            gold: STARTING_GOLD,
            last_tick: now,
            pending_spawns: VecDeque::new(),
            next_tower_id: 1,
            next_enemy_id: 1,
        }
    }

    pub fn add_player(&mut self, player_id: String, name: String) {
        info!("Player {} ({}) joined session {}", player_id, name, self.id);
        self.players.push(PlayerState::new(player_id, name));
    }

    /// Returns true if a player with that id was present.
    pub fn remove_player(&mut self, player_id: &str) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != player_id);
        let removed = self.players.len() != before;
        if removed {
            info!("Player {} left session {}", player_id, self.id);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn set_ready(&mut self, player_id: &str) -> bool {
        match self.players.iter_mut().find(|p| p.id == player_id) {
            Some(player) => {
                player.ready = true;
                true
            }
            None => false,
        }
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    /// Marks the session started. The tick clock restarts here so lobby time
    /// is never simulated.
    pub fn start(&mut self, now: u64) {
        self.started = true;
        self.last_tick = now;
        info!("Session {} started with {} players", self.id, self.players.len());
    }

    /// Places a tower if the kind is known and affordable.
    pub fn place_tower(&mut self, x: f32, y: f32, tower_type: &str, player_id: &str) -> bool {
        let Some(kind) = TowerKind::from_name(tower_type) else {
            debug!("Rejected tower of unknown type {:?} in {}", tower_type, self.id);
            return false;
        };

        let cost = kind.stats().cost;
        if self.gold < cost {
            debug!(
                "Rejected {} tower in {}: cost {} > gold {}",
                kind.as_str(),
                self.id,
                cost,
                self.gold
            );
            return false;
        }

        let id = self.next_tower_id;
        self.next_tower_id += 1;
        self.towers
            .push(TowerState::new(id, x, y, kind, player_id.to_string()));
        self.gold -= cost;
        true
    }

    /// True while live enemies exist or spawns of the current wave are
    /// still pending.
    pub fn has_active_wave(&self) -> bool {
        !self.enemies.is_empty() || !self.pending_spawns.is_empty()
    }

    pub fn pending_spawns(&self) -> usize {
        self.pending_spawns.len()
    }

    /// Starts the next wave. The first enemy enters immediately; the rest
    /// are queued one stagger apart and released by `tick`.
    pub fn spawn_wave(&mut self, now: u64) {
        self.wave += 1;
        let count = wave_enemy_count(self.wave);
        info!("Session {} spawning wave {} ({} enemies)", self.id, self.wave, count);

        for i in 0..count as u64 {
            let spawn = PendingSpawn {
                due: now + i * SPAWN_STAGGER_MS,
                wave: self.wave,
            };
            if i == 0 {
                self.release(spawn);
            } else {
                self.pending_spawns.push_back(spawn);
            }
        }
    }

    fn release(&mut self, spawn: PendingSpawn) {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        self.enemies.push(EnemyState::spawn(id, spawn.wave));
    }

    fn release_due_spawns(&mut self, now: u64) {
        while let Some(spawn) = self.pending_spawns.front().copied() {
            if spawn.due > now {
                break;
            }
            self.pending_spawns.pop_front();
            self.release(spawn);
        }
    }

    /// Advances the simulation to `now`: spawn release, movement, combat
    /// and cleanup, in that order.
    pub fn tick(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.last_tick);
        self.last_tick = now;

        self.release_due_spawns(now);
        self.move_enemies(elapsed);
        self.fire_towers(now);
        self.remove_finished_enemies();
    }

    fn move_enemies(&mut self, elapsed: u64) {
        let frames = elapsed as f32 / FRAME_MS;

        for enemy in self.enemies.iter_mut().filter(|e| e.is_alive()) {
            let target = ENEMY_PATH[enemy.path_index];
            let dx = target.x - enemy.x;
            let dy = target.y - enemy.y;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist < WAYPOINT_RADIUS {
                enemy.path_index += 1;
                if enemy.path_index >= ENEMY_PATH.len() {
                    self.health = (self.health - enemy.damage).max(0);
                    enemy.health = 0;
                }
            } else {
                let step = enemy.speed * frames;
                enemy.x += dx / dist * step;
                enemy.y += dy / dist * step;
            }
        }
    }

    fn fire_towers(&mut self, now: u64) {
        for tower in self.towers.iter_mut() {
            if !tower.can_fire(now) {
                continue;
            }

            // First living enemy in list order, not the nearest one.
            let Some(target) = self
                .enemies
                .iter_mut()
                .find(|e| e.is_alive() && tower.in_range(e))
            else {
                continue;
            };

            target.health -= tower.damage;
            tower.last_fire = Some(now);
            if target.health <= 0 {
                self.gold += target.reward;
            }
        }
    }

    fn remove_finished_enemies(&mut self) {
        self.enemies
            .retain(|e| e.is_alive() && e.path_index < ENEMY_PATH.len());
    }

    pub fn snapshot(&self) -> GameState {
        GameState {
            players: self.players.clone(),
            towers: self.towers.clone(),
            enemies: self.enemies.clone(),
            wave: self.wave,
            health: self.health,
            gold: self.gold,
            game_started: self.started,
        }
    }
}
