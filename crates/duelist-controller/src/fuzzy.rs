//! Fuzzy-rule controller driven by named, range-bounded parameters.
//!
//! The controller runs two small Mamdani inference systems every frame:
//!
//! ```text
//! aggression (0..100)
//!   health low                          → defensive
//!   health high ∧ enemy health low      → aggressive
//!   distance close ∧ health high        → aggressive
//!   distance far                        → balanced
//!
//! jump desire (0..100)
//!   height below                        → yes
//!   height above                        → no
//!   health low ∧ distance close         → yes
//!   distance medium                     → maybe
//! ```
//!
//! Rule strengths use `min` for conjunction, outputs are aggregated with `max` and
//! defuzzified by centroid. The evolvable parameters in [`PARAMETERS`] move the
//! membership breakpoints and the decision thresholds applied to the crisp outputs.

use duelist_engine::{Action, AgentState};

use crate::controller::Controller;

/// Declared name and valid range of one evolvable parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDef {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
}

impl ParamDef {
    const fn new(name: &'static str, min: f32, max: f32) -> Self {
        Self { name, min, max }
    }

    /// Midpoint of the range, used when a parameter is not supplied.
    #[must_use]
    pub fn midpoint(&self) -> f32 {
        f32::midpoint(self.min, self.max)
    }
}

/// Every parameter the fuzzy controller reads, with its valid range.
pub const PARAMETERS: [ParamDef; 21] = [
    // distance membership breakpoints
    ParamDef::new("distance_close_max", 200.0, 500.0),
    ParamDef::new("distance_medium_min", 150.0, 400.0),
    ParamDef::new("distance_medium_max", 400.0, 800.0),
    ParamDef::new("distance_far_min", 500.0, 900.0),
    // own health membership breakpoints
    ParamDef::new("health_low_max", 20.0, 60.0),
    ParamDef::new("health_medium_min", 20.0, 50.0),
    ParamDef::new("health_medium_max", 50.0, 80.0),
    ParamDef::new("health_high_min", 50.0, 80.0),
    // height difference breakpoints
    ParamDef::new("height_below_max", -80.0, -40.0),
    ParamDef::new("height_same_range", 50.0, 120.0),
    ParamDef::new("height_above_min", 40.0, 80.0),
    // combat
    ParamDef::new("aggression_threshold", 20.0, 70.0),
    ParamDef::new("secondary_fire_threshold", 60.0, 90.0),
    ParamDef::new("shoot_distance_max", 300.0, 700.0),
    ParamDef::new("shoot_height_diff_max", 50.0, 150.0),
    // jumping
    ParamDef::new("jump_frames", 15.0, 30.0),
    ParamDef::new("fuzzy_jump_threshold", 40.0, 80.0),
    // navigation
    ParamDef::new("platform_y_tolerance", 80.0, 120.0),
    ParamDef::new("jump_zone_width", 60.0, 120.0),
    // tactics
    ParamDef::new("retreat_health_threshold", 10.0, 40.0),
    ParamDef::new("aggressive_distance", 100.0, 400.0),
];

/// Typed view of the fuzzy parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyParams {
    pub distance_close_max: f32,
    pub distance_medium_min: f32,
    pub distance_medium_max: f32,
    pub distance_far_min: f32,
    pub health_low_max: f32,
    pub health_medium_min: f32,
    pub health_medium_max: f32,
    pub health_high_min: f32,
    pub height_below_max: f32,
    pub height_same_range: f32,
    pub height_above_min: f32,
    pub aggression_threshold: f32,
    pub secondary_fire_threshold: f32,
    pub shoot_distance_max: f32,
    pub shoot_height_diff_max: f32,
    pub jump_frames: f32,
    pub fuzzy_jump_threshold: f32,
    pub platform_y_tolerance: f32,
    pub jump_zone_width: f32,
    pub retreat_health_threshold: f32,
    pub aggressive_distance: f32,
}

impl FuzzyParams {
    /// Builds the parameter set from a name lookup.
    ///
    /// Names the lookup does not know fall back to the midpoint of their declared range.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<f32>,
    {
        let mut get = |name: &str| {
            lookup(name).unwrap_or_else(|| {
                PARAMETERS
                    .iter()
                    .find(|def| def.name == name)
                    .map_or(NEUTRAL_OUTPUT, ParamDef::midpoint)
            })
        };
        Self {
            distance_close_max: get("distance_close_max"),
            distance_medium_min: get("distance_medium_min"),
            distance_medium_max: get("distance_medium_max"),
            distance_far_min: get("distance_far_min"),
            health_low_max: get("health_low_max"),
            health_medium_min: get("health_medium_min"),
            health_medium_max: get("health_medium_max"),
            health_high_min: get("health_high_min"),
            height_below_max: get("height_below_max"),
            height_same_range: get("height_same_range"),
            height_above_min: get("height_above_min"),
            aggression_threshold: get("aggression_threshold"),
            secondary_fire_threshold: get("secondary_fire_threshold"),
            shoot_distance_max: get("shoot_distance_max"),
            shoot_height_diff_max: get("shoot_height_diff_max"),
            jump_frames: get("jump_frames"),
            fuzzy_jump_threshold: get("fuzzy_jump_threshold"),
            platform_y_tolerance: get("platform_y_tolerance"),
            jump_zone_width: get("jump_zone_width"),
            retreat_health_threshold: get("retreat_health_threshold"),
            aggressive_distance: get("aggressive_distance"),
        }
    }
}

/// Triangular membership `[a, b, c]`; `a == b` or `b == c` gives a shoulder.
fn tri(x: f32, [a, b, c]: [f32; 3]) -> f32 {
    if x < a || x > c {
        0.0
    } else if x <= b {
        if b > a { (x - a) / (b - a) } else { 1.0 }
    } else if c > b {
        (c - x) / (c - b)
    } else {
        1.0
    }
}

/// Centroid of the max-aggregated, min-clipped output sets over the `0..=100` universe.
///
/// Returns `None` when no rule fires.
fn centroid(rules: &[(f32, [f32; 3])]) -> Option<f32> {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for u in 0..=100_u8 {
        let u = f32::from(u);
        let mu = rules
            .iter()
            .map(|(strength, set)| strength.min(tri(u, *set)))
            .fold(0.0, f32::max);
        weighted += u * mu;
        total += mu;
    }
    (total > 0.0).then(|| weighted / total)
}

const DEFENSIVE: [f32; 3] = [0.0, 0.0, 40.0];
const BALANCED: [f32; 3] = [30.0, 50.0, 70.0];
const AGGRESSIVE: [f32; 3] = [60.0, 100.0, 100.0];
const JUMP_NO: [f32; 3] = [0.0, 0.0, 30.0];
const JUMP_MAYBE: [f32; 3] = [20.0, 50.0, 80.0];
const JUMP_YES: [f32; 3] = [70.0, 100.0, 100.0];

/// Fallback crisp output when no rule fires.
const NEUTRAL_OUTPUT: f32 = 50.0;
/// Dead band around the preferred stand-off distance.
const SPACING_DEADBAND: f32 = 40.0;

/// Fuzzy-rule controller.
#[derive(Debug, Clone)]
pub struct FuzzyController {
    params: FuzzyParams,
    max_jump_frames: u32,
    jump_frames: u32,
}

impl FuzzyController {
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn new(params: FuzzyParams) -> Self {
        let max_jump_frames = params.jump_frames.max(0.0) as u32;
        Self {
            params,
            max_jump_frames,
            jump_frames: 0,
        }
    }

    #[must_use]
    pub fn params(&self) -> &FuzzyParams {
        &self.params
    }

    fn aggression(&self, distance: f32, health: f32, enemy_health: f32) -> f32 {
        let p = &self.params;
        let close = tri(distance, [0.0, 0.0, p.distance_close_max]);
        let far = tri(distance, [p.distance_far_min, 1000.0, 1300.0]);
        let low = tri(health, [0.0, 0.0, p.health_low_max]);
        let high = tri(health, [p.health_high_min, 100.0, 100.0]);
        let enemy_low = tri(enemy_health, [0.0, 0.0, 40.0]);
        centroid(&[
            (low, DEFENSIVE),
            (high.min(enemy_low), AGGRESSIVE),
            (close.min(high), AGGRESSIVE),
            (far, BALANCED),
        ])
        .unwrap_or(NEUTRAL_OUTPUT)
    }

    fn jump_desire(&self, distance: f32, health: f32, height_diff: f32) -> f32 {
        let p = &self.params;
        let close = tri(distance, [0.0, 0.0, p.distance_close_max]);
        let medium = tri(
            distance,
            [
                p.distance_medium_min,
                f32::midpoint(p.distance_medium_min, p.distance_medium_max),
                p.distance_medium_max,
            ],
        );
        let low = tri(health, [0.0, 0.0, p.health_low_max]);
        let below = tri(height_diff, [-400.0, -400.0, p.height_below_max]);
        let above = tri(height_diff, [p.height_above_min, 400.0, 400.0]);
        centroid(&[
            (below, JUMP_YES),
            (above, JUMP_NO),
            (low.min(close), JUMP_YES),
            (medium, JUMP_MAYBE),
        ])
        .unwrap_or(NEUTRAL_OUTPUT)
    }
}

impl Controller for FuzzyController {
    fn decide(&mut self, _frame: u64, me: &AgentState, enemy: &AgentState) -> Action {
        let p = &self.params;
        let dx = enemy.x - me.x;
        let dy = enemy.y - me.y;
        let distance = dx.abs().min(1300.0);
        let height_diff = (me.y - enemy.y).clamp(-400.0, 400.0);

        let aggression = self.aggression(distance, me.health, enemy.health);
        let jump_desire = self.jump_desire(distance, me.health, height_diff);

        // Chase horizontally; jump when the enemy stands clearly higher and is within reach.
        let mut move_left = dx < 0.0;
        let mut move_right = dx > 0.0;
        let enemy_above = me.y - enemy.y > p.platform_y_tolerance;
        let nav_jump = enemy_above && dx.abs() <= p.jump_zone_width;

        let mut jump =
            nav_jump || (jump_desire > p.fuzzy_jump_threshold && height_diff.abs() < 80.0);
        if jump {
            self.jump_frames += 1;
            jump = self.jump_frames <= self.max_jump_frames;
        } else {
            self.jump_frames = 0;
        }

        // Keep a preferred stand-off distance when on the same level.
        if dy.abs() < 60.0 {
            let target = p.aggressive_distance;
            if distance < target - SPACING_DEADBAND {
                move_left = dx > 0.0;
                move_right = dx < 0.0;
            } else if distance <= target + SPACING_DEADBAND {
                move_left = false;
                move_right = false;
            }
        }
        // Low health overrides spacing: retreat.
        if me.health < p.retreat_health_threshold {
            move_left = dx > 0.0;
            move_right = dx < 0.0;
        }

        let can_shoot =
            height_diff.abs() < p.shoot_height_diff_max && distance < p.shoot_distance_max;
        Action {
            up: jump,
            left: move_left,
            down: false,
            right: move_right,
            primary_fire: can_shoot && aggression > p.aggression_threshold,
            secondary_fire: can_shoot && aggression > p.secondary_fire_threshold,
        }
    }
}
