// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Locked pair example
//!
//! A sphere and a box joined by a lock constraint. The lock is paused
//! mid-flight, the box is pushed, and the lock is resumed.

use physics_sync::prelude::*;
use tracing_subscriber::EnvFilter;

fn gap(world: &PhysicsWorld<ReferenceEngine, ManualTimer>, a: &BodyId, b: &BodyId) -> f64 {
    match (world.body_state(a), world.body_state(b)) {
        (Some(a), Some(b)) => (b.position - a.position).length(),
        _ => f64::NAN,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Physics Sync - Locked Pair Example");
    println!("==================================\n");

    let timer = ManualTimer::new();
    let mut world = PhysicsWorld::new(
        Vector3::new(0.0, -9.82, 0.0),
        ReferenceEngine::new(),
        timer.clone(),
    );

    let sphere_config: ObjectConfig = match serde_json::from_str(
        r#"{"body": {"mass": 1, "radius": 0.5, "transform": {"position": {"x": 0, "y": 10, "z": 0}}}}"#,
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("bad config: {}", err);
            return;
        }
    };
    let box_config = ObjectConfig::default().with_body(BodyOverrides {
        mass: Some(5.0),
        radius: None,
        transform: Some(TransformOverrides {
            position: Some(Vector3::new(0.0, 12.0, 0.0)),
            scale: Some(Vector3::new(0.5, 0.5, 0.5)),
            ..Default::default()
        }),
    });

    let (Some(sphere), Some(cube)) = (
        world.create_object(None, ShapeKind::Sphere, sphere_config),
        world.create_object(None, ShapeKind::Box, box_config),
    ) else {
        eprintln!("failed to create bodies");
        return;
    };

    let args = ConstraintArgs {
        body_a: Some(sphere.clone()),
        body_b: Some(cube.clone()),
        pivot_a: Some(Vector3::new(0.0, 2.0, 0.0)),
        ..Default::default()
    };
    let Some(lock) = world.create_constraint_from_args("lock", &args) else {
        return;
    };
    println!("Lock {} between {} and {}", lock, sphere, cube);

    world.start();
    timer.advance(200.0);
    println!("  locked:   gap = {:.4}", gap(&world, &sphere, &cube));

    world.pause_constraint(&lock);
    world.with_body_state_mut(&cube, |state| state.velocity = Vector3::new(4.0, 0.0, 0.0));
    timer.advance(200.0);
    println!("  paused:   gap = {:.4}", gap(&world, &sphere, &cube));

    world.resume_constraint(&lock);
    timer.advance(200.0);
    println!("  resumed:  gap = {:.4}", gap(&world, &sphere, &cube));

    world.remove_constraint(&lock, true);
    world.stop();
    println!("\nConstraints left: {}", world.constraint_count());
}
