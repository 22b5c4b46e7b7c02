//! A small kinematic demo arena.
//!
//! This is the stand-in for a real physics engine: a bounded rectangle
//! of boxes, lights, and random-walking bots. It exists so the server is
//! runnable out of the box; physics correctness is explicitly not its
//! job. Collision checking is arena-bounds only.
//!
//! Entity composition mirrors the simulators this server fronts: some
//! entities are embodied directly (boxes, lights), mobile robots are
//! composable entities whose pose lives on a `body` sub-component, and
//! the floor has no movable body at all. Move requests resolve through
//! that two-level fallback.

use std::time::Duration;

use arenaviz_core::engine::{EngineError, EntityRecord, MoveOutcome, SimulationEngine};
use arenaviz_types::{ArenaInfo, Quaternion, Vec3};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

/// Construction parameters for the demo arena.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Number of static boxes.
    pub boxes: u32,
    /// Number of lights.
    pub lights: u32,
    /// Number of random-walking bots.
    pub bots: u32,
    /// Arena extent (centered on the origin).
    pub arena_size: Vec3,
    /// Real-time duration of one step.
    pub clock_tick: Duration,
    /// Steps after which the experiment reports finished; `None` runs
    /// until terminated.
    pub step_limit: Option<u64>,
    /// Random walk seed.
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            boxes: 4,
            lights: 2,
            bots: 3,
            arena_size: Vec3::new(10.0, 10.0, 2.0),
            clock_tick: Duration::from_millis(10),
            step_limit: None,
            seed: 42,
        }
    }
}

/// How a demo entity's pose is reachable, if at all.
#[derive(Debug, Clone, PartialEq)]
enum Pose {
    /// The entity itself is embodied.
    Embodied(Placement),
    /// The entity is composable; the pose lives on its body component.
    Body(Placement),
    /// No movable body (the floor).
    None,
}

/// A position/orientation pair.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    position: Vec3,
    orientation: Quaternion,
}

#[derive(Debug, Clone, PartialEq)]
struct DemoEntity {
    id: String,
    kind: String,
    pose: Pose,
    extra: serde_json::Value,
}

impl DemoEntity {
    /// Two-level resolution: the embodied pose directly, else the body
    /// sub-component's pose.
    fn movable_placement_mut(&mut self) -> Option<&mut Placement> {
        match &mut self.pose {
            Pose::Embodied(placement) | Pose::Body(placement) => Some(placement),
            Pose::None => None,
        }
    }

    fn placement(&self) -> Placement {
        match &self.pose {
            Pose::Embodied(placement) | Pose::Body(placement) => *placement,
            Pose::None => Placement {
                position: Vec3::default(),
                orientation: Quaternion::identity(),
            },
        }
    }
}

/// The demo engine.
#[derive(Debug)]
pub struct DemoArena {
    config: DemoConfig,
    entities: Vec<DemoEntity>,
    initial: Vec<DemoEntity>,
    steps: u64,
    terminated: bool,
    rng: StdRng,
}

impl DemoArena {
    /// Build an arena from the given configuration.
    pub fn new(config: DemoConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut entities = Vec::new();

        entities.push(DemoEntity {
            id: String::from("floor"),
            kind: String::from("floor"),
            pose: Pose::None,
            extra: serde_json::json!({
                "size": { "x": config.arena_size.x, "y": config.arena_size.y },
            }),
        });

        for index in 0..config.boxes {
            entities.push(DemoEntity {
                id: format!("box_{index}"),
                kind: String::from("box"),
                pose: Pose::Embodied(random_placement(&mut rng, config.arena_size)),
                extra: serde_json::json!({
                    "scale": { "x": 0.5, "y": 0.5, "z": 0.5 },
                }),
            });
        }

        for index in 0..config.lights {
            entities.push(DemoEntity {
                id: format!("light_{index}"),
                kind: String::from("light"),
                pose: Pose::Embodied(random_placement(&mut rng, config.arena_size)),
                extra: serde_json::json!({ "intensity": 1.0 }),
            });
        }

        for index in 0..config.bots {
            entities.push(DemoEntity {
                id: format!("bot_{index}"),
                kind: String::from("bot"),
                pose: Pose::Body(random_placement(&mut rng, config.arena_size)),
                extra: serde_json::Value::Null,
            });
        }

        let initial = entities.clone();
        Self {
            config,
            entities,
            initial,
            steps: 0,
            terminated: false,
            rng,
        }
    }

    fn within_bounds(&self, position: Vec3) -> bool {
        let half_x = self.config.arena_size.x / 2.0;
        let half_y = self.config.arena_size.y / 2.0;
        position.x.abs() <= half_x && position.y.abs() <= half_y
    }
}

/// A random placement on the arena floor, away from the walls.
fn random_placement(rng: &mut StdRng, arena_size: Vec3) -> Placement {
    let half_x = (arena_size.x / 2.0) * 0.8;
    let half_y = (arena_size.y / 2.0) * 0.8;
    Placement {
        position: Vec3::new(
            rng.random_range(-half_x..=half_x),
            rng.random_range(-half_y..=half_y),
            0.0,
        ),
        orientation: Quaternion::identity(),
    }
}

impl SimulationEngine for DemoArena {
    fn step(&mut self) {
        let half_x = self.config.arena_size.x / 2.0;
        let half_y = self.config.arena_size.y / 2.0;

        for entity in &mut self.entities {
            if entity.kind != "bot" {
                continue;
            }
            let step_x = self.rng.random_range(-0.05..=0.05);
            let step_y = self.rng.random_range(-0.05..=0.05);
            if let Some(placement) = entity.movable_placement_mut() {
                placement.position.x = (placement.position.x + step_x).clamp(-half_x, half_x);
                placement.position.y = (placement.position.y + step_y).clamp(-half_y, half_y);
            }
        }

        self.steps = self.steps.saturating_add(1);
    }

    fn is_finished(&self) -> bool {
        self.terminated
            || self
                .config
                .step_limit
                .is_some_and(|limit| self.steps >= limit)
    }

    fn reset(&mut self) {
        self.entities = self.initial.clone();
        self.steps = 0;
        self.terminated = false;
        self.rng = StdRng::seed_from_u64(self.config.seed);
    }

    fn terminate(&mut self) {
        self.terminated = true;
    }

    fn clock_tick(&self) -> Duration {
        self.config.clock_tick
    }

    fn step_count(&self) -> u64 {
        self.steps
    }

    fn arena(&self) -> ArenaInfo {
        ArenaInfo {
            size: self.config.arena_size,
            center: Vec3::default(),
        }
    }

    fn entities(&self) -> Vec<EntityRecord> {
        self.entities
            .iter()
            .map(|entity| {
                let placement = entity.placement();
                EntityRecord {
                    id: entity.id.clone(),
                    kind: entity.kind.clone(),
                    position: placement.position,
                    orientation: placement.orientation,
                    extra: entity.extra.clone(),
                }
            })
            .collect()
    }

    fn move_entity(
        &mut self,
        id: &str,
        position: Vec3,
        orientation: Quaternion,
    ) -> Result<MoveOutcome, EngineError> {
        if !self.within_bounds(position) {
            // Resolve the entity first so an unknown id still reports
            // not-found rather than collision.
            if !self.entities.iter().any(|e| e.id == id) {
                return Err(EngineError::EntityNotFound {
                    id: String::from(id),
                });
            }
            return Ok(MoveOutcome::CollisionRefused);
        }

        let entity = self
            .entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EngineError::EntityNotFound {
                id: String::from(id),
            })?;

        let Some(placement) = entity.movable_placement_mut() else {
            return Err(EngineError::EntityNotFound {
                id: String::from(id),
            });
        };

        placement.position = position;
        placement.orientation = orientation;
        Ok(MoveOutcome::Moved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_arena() -> DemoArena {
        DemoArena::new(DemoConfig::default())
    }

    #[test]
    fn contains_the_configured_entities() {
        let arena = make_arena();
        let records = arena.entities();
        // floor + 4 boxes + 2 lights + 3 bots
        assert_eq!(records.len(), 10);
        assert_eq!(records.iter().filter(|r| r.kind == "bot").count(), 3);
        assert_eq!(records.iter().filter(|r| r.kind == "floor").count(), 1);
    }

    #[test]
    fn stepping_keeps_bots_inside_the_arena() {
        let mut arena = make_arena();
        for _ in 0..200 {
            arena.step();
        }
        assert_eq!(arena.step_count(), 200);
        for record in arena.entities() {
            if record.kind == "bot" {
                assert!(record.position.x.abs() <= 5.0);
                assert!(record.position.y.abs() <= 5.0);
            }
        }
    }

    #[test]
    fn finishes_at_the_step_limit() {
        let mut arena = DemoArena::new(DemoConfig {
            step_limit: Some(3),
            ..DemoConfig::default()
        });
        assert!(!arena.is_finished());
        for _ in 0..3 {
            arena.step();
        }
        assert!(arena.is_finished());
    }

    #[test]
    fn terminate_finishes_immediately() {
        let mut arena = make_arena();
        assert!(!arena.is_finished());
        arena.terminate();
        assert!(arena.is_finished());
    }

    #[test]
    fn reset_restores_the_initial_world() {
        let mut arena = make_arena();
        let before = arena.entities();
        for _ in 0..50 {
            arena.step();
        }
        arena.terminate();

        arena.reset();
        assert_eq!(arena.step_count(), 0);
        assert!(!arena.is_finished());
        assert_eq!(arena.entities(), before);
    }

    #[test]
    fn moves_an_embodied_entity_directly() {
        let mut arena = make_arena();
        let outcome = arena
            .move_entity("box_0", Vec3::new(1.0, 1.0, 0.0), Quaternion::identity())
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);
        let moved = arena
            .entities()
            .into_iter()
            .find(|r| r.id == "box_0")
            .unwrap();
        assert_eq!(moved.position, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn moves_a_composed_entity_through_its_body() {
        let mut arena = make_arena();
        let outcome = arena
            .move_entity("bot_1", Vec3::new(-2.0, 3.0, 0.0), Quaternion::identity())
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut arena = make_arena();
        let err = arena
            .move_entity("ghost", Vec3::default(), Quaternion::identity())
            .unwrap_err();
        assert!(format!("{err}").contains("ghost"));
    }

    #[test]
    fn bodyless_entity_is_not_movable() {
        let mut arena = make_arena();
        let result = arena.move_entity("floor", Vec3::default(), Quaternion::identity());
        assert!(result.is_err());
    }

    #[test]
    fn out_of_bounds_move_is_a_collision_refusal() {
        let mut arena = make_arena();
        let outcome = arena
            .move_entity("box_0", Vec3::new(50.0, 0.0, 0.0), Quaternion::identity())
            .unwrap();
        assert_eq!(outcome, MoveOutcome::CollisionRefused);
    }

    #[test]
    fn out_of_bounds_move_of_unknown_id_is_still_not_found() {
        let mut arena = make_arena();
        let result = arena.move_entity("ghost", Vec3::new(50.0, 0.0, 0.0), Quaternion::identity());
        assert!(result.is_err());
    }
}
