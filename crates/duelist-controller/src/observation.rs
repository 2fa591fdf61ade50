//! Fixed feature vector consumed by the neural controller.

use duelist_engine::AgentState;

/// Number of features produced by [`features`].
pub const FEATURE_COUNT: usize = 12;

/// Vertical band (pixels) in which two agents count as standing on the same level.
const LEVEL_BAND: f32 = 40.0;

/// Builds the normalized observation of `enemy` as seen from `me`.
///
/// Layout:
///
/// | index | feature |
/// |---|---|
/// | 0 | horizontal offset / 640 |
/// | 1 | vertical offset / 360 (positive: enemy lower) |
/// | 2 | length of (0, 1) |
/// | 3, 4 | own / enemy health / 100 |
/// | 5, 6 | own / enemy lives / 3 |
/// | 7 | facing (-1 left, +1 right) |
/// | 8, 9, 10 | above / below / same level indicators |
/// | 11 | constant 1 |
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn features(me: &AgentState, enemy: &AgentState) -> [f32; FEATURE_COUNT] {
    let dx = (enemy.x - me.x) / 640.0;
    let dy = (enemy.y - me.y) / 360.0;
    let indicator = |b: bool| if b { 1.0 } else { 0.0 };
    [
        dx,
        dy,
        dx.hypot(dy),
        me.health / 100.0,
        enemy.health / 100.0,
        me.lives as f32 / 3.0,
        enemy.lives as f32 / 3.0,
        me.facing.sign(),
        indicator(me.y < enemy.y - LEVEL_BAND),
        indicator(me.y > enemy.y + LEVEL_BAND),
        indicator((me.y - enemy.y).abs() <= LEVEL_BAND),
        1.0,
    ]
}
