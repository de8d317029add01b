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
//! Falling sphere example
//!
//! A sphere dropped onto a ground plane. The scene nodes are updated by the
//! world on every tick; stopping the world puts them back where they began.
//!
//! Run with `RUST_LOG=physics_sync=debug` to see the world's own logging.

use physics_sync::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Physics Sync - Falling Sphere Example");
    println!("=====================================\n");

    let timer = ManualTimer::new();
    let mut world = PhysicsWorld::new(
        Vector3::new(0.0, -9.82, 0.0),
        ReferenceEngine::new(),
        timer.clone(),
    );

    let plane = SceneObject::shared("plane0", NodeTransform::default());
    let sphere = SceneObject::shared("SphereObject", NodeTransform::at(0.0, 4.0, 0.0));

    world.create_object(Some(plane.clone()), ShapeKind::Ground, ObjectConfig::default());
    let ball = world.create_object(
        Some(sphere.clone()),
        ShapeKind::Sphere,
        ObjectConfig::default().with_body(BodyOverrides {
            mass: Some(1.0),
            radius: Some(0.5),
            transform: Some(TransformOverrides {
                position: Some(Vector3::new(0.0, 4.0, 0.0)),
                ..Default::default()
            }),
        }),
    );
    let Some(ball) = ball else {
        eprintln!("failed to create the sphere");
        return;
    };
    println!("Created sphere {}", ball);

    world.start();
    for _ in 0..12 {
        timer.advance(100.0);
        let t = *sphere.borrow().transform();
        let speed = world
            .body_state(&ball)
            .map(|state| state.velocity.length())
            .unwrap_or(0.0);
        println!(
            "  t = {:>5.0} ms  y = {:>6.3}  |v| = {:>6.3}",
            timer.now(),
            t.y,
            speed
        );
    }

    world.stop();
    println!("\nStopped; sphere back at y = {:.3}", sphere.borrow().transform().y);
}
