/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound cues and banners.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    LevelLoaded { index: usize },
    Jumped,
    Dashed,
    RewardCollected,
    EnemyShot,
    EnemyKilled { score: u32 },
    HitByEnemy,
    HitByFire,
    /// `near`: within earshot of the player.
    FireballLaunched { near: bool },
    PlayerDied,
    LevelCleared,
    GameOver,
    Finale,
    NewHighScore(u32),
}
