use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    SimulatorError,
    core::{Action, AgentId, AgentState, Facing},
};

use super::{Arena, ArenaFactory, SimulatorConfig};

/// Damage, cooldown and projectile speed of one fire button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub damage: f32,
    /// Seconds between two shots.
    pub cooldown: f32,
    /// Projectile speed in pixels per second.
    pub speed: f32,
}

/// Tunables of the reference duel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaRules {
    pub stage_width: f32,
    pub ground_y: f32,
    pub move_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub max_lives: u32,
    pub spawn_x: [f32; 2],
    pub primary: WeaponSpec,
    pub secondary: WeaponSpec,
    /// When `false`, fire inputs are ignored.
    pub weapons_enabled: bool,
}

impl Default for ArenaRules {
    fn default() -> Self {
        Self {
            stage_width: 1000.0,
            ground_y: 430.0,
            move_speed: 300.0,
            jump_speed: 650.0,
            gravity: 1800.0,
            max_lives: 3,
            spawn_x: [200.0, 800.0],
            primary: WeaponSpec {
                damage: 10.0,
                cooldown: 0.25,
                speed: 900.0,
            },
            secondary: WeaponSpec {
                damage: 25.0,
                cooldown: 1.0,
                speed: 600.0,
            },
            weapons_enabled: true,
        }
    }
}

const HALF_WIDTH: f32 = 20.0;
const HEIGHT: f32 = 60.0;
const MUZZLE_HEIGHT: f32 = 30.0;

#[derive(Debug, Clone)]
struct Fighter {
    id: AgentId,
    spawn_x: f32,
    spawn_facing: Facing,
    state: AgentState,
    vy: f32,
    action: Action,
    primary_cooldown: f32,
    secondary_cooldown: f32,
}

impl Fighter {
    fn on_ground(&self, rules: &ArenaRules) -> bool {
        self.state.y >= rules.ground_y
    }

    fn respawn(&mut self, rules: &ArenaRules) {
        self.state.x = self.spawn_x;
        self.state.y = rules.ground_y;
        self.state.health = AgentState::MAX_HEALTH;
        self.state.facing = self.spawn_facing;
        self.vy = 0.0;
    }

    fn take_damage(&mut self, damage: f32, rules: &ArenaRules) {
        if self.state.is_eliminated() {
            return;
        }
        self.state.health -= damage;
        if self.state.health <= 0.0 {
            self.state.lives -= 1;
            if self.state.lives > 0 {
                self.respawn(rules);
            } else {
                self.state.health = 0.0;
            }
        }
    }

    fn hit_by(&self, projectile: &Projectile) -> bool {
        let top = self.state.y - HEIGHT;
        projectile.owner != self.id
            && !self.state.is_eliminated()
            && (projectile.x - self.state.x).abs() <= HALF_WIDTH
            && (top..=self.state.y).contains(&projectile.y)
    }
}

#[derive(Debug, Clone)]
struct Projectile {
    owner: AgentId,
    x: f32,
    y: f32,
    vx: f32,
    damage: f32,
}

/// Deterministic flat-stage duel between two agents.
///
/// Agents `1` and `2` spawn facing each other. They can walk, jump, and fire
/// projectiles in the direction they face. Dropping to zero health costs a life and
/// respawns the agent at its spawn point; the arena keeps running after a knockout so the
/// match runner observes the terminal state.
#[derive(Debug, Clone)]
pub struct DuelArena {
    rules: ArenaRules,
    fighters: Vec<Fighter>,
    projectiles: Vec<Projectile>,
    running: bool,
}

impl DuelArena {
    #[must_use]
    pub fn new(rules: ArenaRules) -> Self {
        Self {
            rules,
            fighters: vec![],
            projectiles: vec![],
            running: false,
        }
    }

    fn spawn_fighters(&mut self) {
        let rules = &self.rules;
        self.fighters = [(1, rules.spawn_x[0]), (2, rules.spawn_x[1])]
            .into_iter()
            .map(|(id, x)| {
                let facing = if x < rules.stage_width / 2.0 {
                    Facing::Right
                } else {
                    Facing::Left
                };
                Fighter {
                    id: AgentId(id),
                    spawn_x: x,
                    spawn_facing: facing,
                    state: AgentState {
                        x,
                        y: rules.ground_y,
                        health: AgentState::MAX_HEALTH,
                        lives: rules.max_lives,
                        facing,
                    },
                    vy: 0.0,
                    action: Action::IDLE,
                    primary_cooldown: 0.0,
                    secondary_cooldown: 0.0,
                }
            })
            .collect();
        self.projectiles.clear();
    }

    fn move_fighters(&mut self, dt: f32) {
        let rules = &self.rules;
        for fighter in &mut self.fighters {
            if fighter.state.is_eliminated() {
                continue;
            }
            let action = fighter.action;
            let dx = match (action.left, action.right) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            };
            if dx < 0.0 {
                fighter.state.facing = Facing::Left;
            } else if dx > 0.0 {
                fighter.state.facing = Facing::Right;
            }
            fighter.state.x =
                (fighter.state.x + dx * rules.move_speed * dt).clamp(0.0, rules.stage_width);

            if action.up && fighter.on_ground(rules) {
                fighter.vy = -rules.jump_speed;
            }
            fighter.vy += rules.gravity * dt;
            fighter.state.y += fighter.vy * dt;
            if fighter.state.y >= rules.ground_y {
                fighter.state.y = rules.ground_y;
                fighter.vy = 0.0;
            }
        }
    }

    fn fire_weapons(&mut self, dt: f32) {
        let rules = &self.rules;
        for fighter in &mut self.fighters {
            fighter.primary_cooldown = (fighter.primary_cooldown - dt).max(0.0);
            fighter.secondary_cooldown = (fighter.secondary_cooldown - dt).max(0.0);
            if !rules.weapons_enabled || fighter.state.is_eliminated() {
                continue;
            }
            let shoot = |spec: &WeaponSpec| Projectile {
                owner: fighter.id,
                x: fighter.state.x,
                y: fighter.state.y - MUZZLE_HEIGHT,
                vx: spec.speed * fighter.state.facing.sign(),
                damage: spec.damage,
            };
            if fighter.action.primary_fire && fighter.primary_cooldown <= 0.0 {
                self.projectiles.push(shoot(&rules.primary));
                fighter.primary_cooldown = rules.primary.cooldown;
            }
            if fighter.action.secondary_fire && fighter.secondary_cooldown <= 0.0 {
                self.projectiles.push(shoot(&rules.secondary));
                fighter.secondary_cooldown = rules.secondary.cooldown;
            }
        }
    }

    fn move_projectiles(&mut self, dt: f32) {
        let rules = &self.rules;
        let fighters = &mut self.fighters;
        self.projectiles.retain_mut(|projectile| {
            projectile.x += projectile.vx * dt;
            let projectile = &*projectile;
            if let Some(target) = fighters.iter_mut().find(|f| f.hit_by(projectile)) {
                target.take_damage(projectile.damage, rules);
                return false;
            }
            (0.0..=rules.stage_width).contains(&projectile.x)
        });
    }
}

impl Arena for DuelArena {
    fn init(&mut self, label: &str) -> Result<(), SimulatorError> {
        log::trace!("initializing duel arena '{label}'");
        self.spawn_fighters();
        self.running = true;
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), SimulatorError> {
        if !self.running {
            return Err(SimulatorError::ShutDown);
        }
        self.move_fighters(dt);
        self.fire_weapons(dt);
        self.move_projectiles(dt);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn agent_states(&self) -> BTreeMap<AgentId, AgentState> {
        self.fighters.iter().map(|f| (f.id, f.state)).collect()
    }

    fn apply_action(&mut self, agent: AgentId, action: Action) -> Result<(), SimulatorError> {
        if !self.running {
            return Err(SimulatorError::ShutDown);
        }
        let fighter = self
            .fighters
            .iter_mut()
            .find(|f| f.id == agent)
            .ok_or(SimulatorError::UnknownAgent { agent })?;
        fighter.action = action;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running = false;
        self.projectiles.clear();
    }
}

/// Creates [`DuelArena`] instances sharing one set of rules.
#[derive(Default, Debug, Clone)]
pub struct DuelArenaFactory {
    pub rules: ArenaRules,
}

impl DuelArenaFactory {
    #[must_use]
    pub fn new(rules: ArenaRules) -> Self {
        Self { rules }
    }
}

impl ArenaFactory for DuelArenaFactory {
    fn create(&self, _config: &SimulatorConfig) -> Result<Box<dyn Arena>, SimulatorError> {
        Ok(Box::new(DuelArena::new(self.rules.clone())))
    }
}
