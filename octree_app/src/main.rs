//! Headless octree simulation
//!
//! Spawns bodies with every collider kind inside the world cube, moves them
//! each tick, and runs the collision system:
//! - Bodies bounce off walls slightly outside the world, so some of them
//!   leave the index and come back
//! - Hulls spin, so their bounds grow and shrink
//! - Rays sweep through the tree and report what they touch
//!
//! Usage: `octree_sim [config.toml|config.ron] [ticks]`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spatial_engine::debug::CollisionDebugVisualizer;
use spatial_engine::foundation::logging;
use spatial_engine::foundation::math::{Quat, Vec3};
use spatial_engine::prelude::*;

// Entity counts
const NUM_SPHERES: usize = 20;
const NUM_BOXES: usize = 10;
const NUM_HULLS: usize = 8;
const NUM_RAYS: usize = 3;

// Movement
const SPEED: f32 = 12.0;
const SPIN_SPEED: f32 = 0.8;
const BOUNCE_MARGIN: f32 = 1.1; // Walls sit 10% outside the world bounds
const DELTA_TIME: f32 = 1.0 / 60.0;
const DEFAULT_TICKS: u32 = 600;
const REPORT_EVERY: u32 = 60;
const SEED: u64 = 0x5eed;

struct Mover {
    entity: Entity,
    velocity: Vec3,
    spin: Option<Vec3>,
}

struct OctreeSimApp {
    world: World,
    physics: PhysicsCollisionSystem,
    visualizer: CollisionDebugVisualizer,
    movers: Vec<Mover>,
    rays: Vec<Entity>,
    wall: f32,
    rng: StdRng,
    total_contacts: usize,
    boundary_exits: usize,
}

impl OctreeSimApp {
    fn new(config: &SpatialConfig) -> Result<Self, PhysicsError> {
        let mut app = Self {
            world: World::new(&config.pool),
            physics: PhysicsCollisionSystem::new(config),
            visualizer: CollisionDebugVisualizer::new(),
            movers: Vec::new(),
            rays: Vec::new(),
            wall: config.octree.world_half_extent * BOUNCE_MARGIN,
            rng: StdRng::seed_from_u64(SEED),
            total_contacts: 0,
            boundary_exits: 0,
        };

        let inner = config.octree.world_half_extent * 0.8;

        for _ in 0..NUM_SPHERES {
            let radius = app.rng.gen_range(0.5..3.0);
            let entity = app.spawn_mover(inner, None);
            app.physics
                .attach_sphere(&mut app.world, entity, Sphere::new(Vec3::zeros(), radius))?;
        }

        for _ in 0..NUM_BOXES {
            let half = Vec3::new(
                app.rng.gen_range(0.5..2.5),
                app.rng.gen_range(0.5..2.5),
                app.rng.gen_range(0.5..2.5),
            );
            let entity = app.spawn_mover(inner, None);
            app.physics
                .attach_aabb(&mut app.world, entity, AABB::from_center_extents(Vec3::zeros(), half))?;
        }

        for _ in 0..NUM_HULLS {
            let size = app.rng.gen_range(1.0..3.0);
            let spin = app.random_direction() * SPIN_SPEED;
            let entity = app.spawn_mover(inner, Some(spin));
            app.physics
                .attach_hull(&mut app.world, entity, ConvexHull::cuboid(Vec3::new(size, size * 0.5, size)))?;
        }

        for i in 0..NUM_RAYS {
            // Rays sit on the -X wall and sweep along +X at different heights
            let height = (i as f32 - 1.0) * inner * 0.5;
            let entity = app.world.spawn(Frame::from_position(Vec3::new(-inner, height, 0.0)));
            app.physics.attach_ray(&mut app.world, entity, Ray::new(Vec3::zeros(), Vec3::x()))?;
            app.rays.push(entity);
        }

        log::info!(
            "Spawned {} bodies ({} spheres, {} boxes, {} hulls, {} rays)",
            app.world.len(),
            NUM_SPHERES,
            NUM_BOXES,
            NUM_HULLS,
            NUM_RAYS
        );
        Ok(app)
    }

    fn random_direction(&mut self) -> Vec3 {
        let direction = Vec3::new(
            self.rng.gen_range(-1.0..1.0),
            self.rng.gen_range(-1.0..1.0),
            self.rng.gen_range(-1.0..1.0),
        );
        direction.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x)
    }

    fn spawn_mover(&mut self, bounds: f32, spin: Option<Vec3>) -> Entity {
        let position = Vec3::new(
            self.rng.gen_range(-bounds..bounds),
            self.rng.gen_range(-bounds..bounds),
            self.rng.gen_range(-bounds..bounds),
        );
        let velocity = self.random_direction() * SPEED;
        let entity = self.world.spawn(Frame::from_position(position));
        self.movers.push(Mover { entity, velocity, spin });
        entity
    }

    /// Integrate positions and spins, bouncing off the walls
    fn move_bodies(&mut self, delta_time: f32) {
        for mover in &mut self.movers {
            let Some(frame) = self.world.frame_mut(mover.entity) else {
                continue;
            };

            frame.position += mover.velocity * delta_time;
            for axis in 0..3 {
                if frame.position[axis].abs() > self.wall {
                    frame.position[axis] = frame.position[axis].clamp(-self.wall, self.wall);
                    mover.velocity[axis] = -mover.velocity[axis];
                }
            }

            if let Some(spin) = mover.spin {
                frame.rotate_by(Quat::from_scaled_axis(spin * delta_time));
            }
        }
    }

    fn update(&mut self, tick: u32, delta_time: f32) -> Result<(), PhysicsError> {
        self.move_bodies(delta_time);
        let report = self.physics.step(&mut self.world)?;

        self.total_contacts += report.collisions.len();
        for event in &report.index.events {
            match event {
                IndexEvent::LeftBounds(entity) => {
                    self.boundary_exits += 1;
                    log::debug!("Tick {}: {} left the world", tick, entity);
                }
                IndexEvent::Reentered(entity) => log::debug!("Tick {}: {} is back", tick, entity),
            }
        }
        for pair in &report.entered {
            log::trace!("Tick {}: {} touched {}", tick, pair.entity_a, pair.entity_b);
        }

        if cfg!(debug_assertions) {
            if let Err(err) = self.physics.check_consistency() {
                log::error!("Index inconsistent after tick {}: {}", tick, err);
            }
        }

        if tick % REPORT_EVERY == 0 {
            self.report(tick, &report);
        }
        Ok(())
    }

    fn report(&self, tick: u32, report: &StepReport) {
        let tree = self.physics.index().tree();
        let frame = self.visualizer.collect(&self.physics, &self.world);
        let occupied = frame.boxes.iter().filter(|debug_box| debug_box.occupied).count();

        log::info!(
            "Tick {}: {} nodes, depth {}, {} memberships, {} candidates, {} touching (+{} -{}), {} status changes, {} pruned",
            tick,
            tree.node_count(),
            tree.max_depth_reached(),
            tree.occupancy_count(),
            report.candidates,
            report.collisions.len(),
            report.entered.len(),
            report.exited.len(),
            report.index.status_changes,
            report.pruned
        );
        log::info!(
            "Tick {}: {} debug boxes ({} occupied), {} collider views",
            tick,
            frame.boxes.len(),
            occupied,
            frame.colliders.len()
        );

        for &ray in &self.rays {
            let hits: Vec<_> = self
                .world
                .collider(ray)
                .map(|collider| collider.colliding().to_vec())
                .unwrap_or_default();
            log::debug!("Tick {}: {} touches {:?}", tick, ray, hits);
        }
    }

    fn run(mut self, ticks: u32) -> Result<(), PhysicsError> {
        for tick in 1..=ticks {
            self.update(tick, DELTA_TIME)?;
        }

        // One ray cast along the diagonal, nearest hit first
        let hits = self
            .physics
            .ray_cast(&self.world, Vec3::new(-90.0, -90.0, -90.0), Vec3::new(1.0, 1.0, 1.0));
        if let Some(hit) = hits.first() {
            log::info!("Diagonal ray cast: {} hits, nearest {} at {:.2}", hits.len(), hit.entity, hit.distance);
        }

        log::info!(
            "Finished {} ticks: {} contacts total, {} boundary exits, {} bodies indexed of {}",
            ticks,
            self.total_contacts,
            self.boundary_exits,
            self.physics.index().log().len(),
            self.world.len()
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => SpatialConfig::load_from_file(&path)?,
        None => SpatialConfig::default(),
    };
    let ticks = match args.next() {
        Some(ticks) => ticks.parse()?,
        None => DEFAULT_TICKS,
    };

    logging::init_with_filter(&config.log_level);
    config.validate()?;

    let app = OctreeSimApp::new(&config)?;
    app.run(ticks)?;
    Ok(())
}
