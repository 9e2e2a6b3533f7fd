//! Wavefront render loop.
//!
//! One iteration renders one sample per pixel:
//!
//! 1. The camera creates a path per pixel.
//! 2. For each bounce, every active path is intersected, optionally sorted
//!    by material, and shaded in parallel.
//! 3. Finished paths are compacted out of the active range.
//! 4. When no paths remain, the gather step adds their radiance into the
//!    accumulation buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use lumen_core::Scene;
use lumen_math::Placement;
use rayon::prelude::*;

use crate::accel::SceneAccel;
use crate::buffer::AccumulationBuffer;
use crate::camera::Camera;
use crate::compaction::{compact_paths, sort_by_material};
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::integrator::Integrator;
use crate::light::LightSampler;
use crate::path::{PathState, ShadeableIntersection};
use crate::sampling::path_rng;

/// Progressive path tracer over a validated scene.
pub struct Renderer {
    scene: Scene,
    config: RenderConfig,
    accel: SceneAccel,
    lights: LightSampler,
    camera: Camera,
    pool: Option<rayon::ThreadPool>,
    cancel: Arc<AtomicBool>,
    // Scratch reused across iterations
    paths: Vec<PathState>,
    intersections: Vec<ShadeableIntersection>,
}

impl Renderer {
    /// Validate inputs and build the acceleration structures.
    pub fn new(scene: Scene, config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        scene.validate()?;

        let pool = if config.threads > 0 {
            Some(rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?)
        } else {
            None
        };

        let accel = SceneAccel::build(&scene)?;
        let lights = LightSampler::new(&scene, config.light_selection);
        let camera = Camera::new(&scene.camera);

        log::info!(
            "Renderer ready: {}x{}, max depth {}, {} lights, {} threads",
            camera.image_width,
            camera.image_height,
            config.max_depth,
            lights.len(),
            if config.threads == 0 {
                rayon::current_num_threads()
            } else {
                config.threads
            }
        );

        Ok(Self {
            scene,
            config,
            accel,
            lights,
            camera,
            pool,
            cancel: Arc::new(AtomicBool::new(false)),
            paths: Vec::new(),
            intersections: Vec::new(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn accel(&self) -> &SceneAccel {
        &self.accel
    }

    /// Flag checked between iterations; set it to stop `render` early.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// A buffer sized for the scene camera.
    pub fn create_buffer(&self) -> AccumulationBuffer {
        AccumulationBuffer::new(self.camera.image_width, self.camera.image_height)
    }

    /// Move a geometry instance. Acceleration structures are rebuilt before
    /// the next iteration; callers should reset their buffer.
    pub fn set_geom_placement(&mut self, geom_id: usize, placement: Placement) -> Result<(), RenderError> {
        self.scene.set_geom_placement(geom_id, placement)?;
        Ok(())
    }

    /// Rebuild the BVH and light tables if the scene changed.
    fn refresh(&mut self) -> Result<(), RenderError> {
        if self.accel.is_stale(&self.scene) {
            log::debug!("Scene generation changed, rebuilding acceleration structures");
            self.accel = SceneAccel::build(&self.scene)?;
            self.lights = LightSampler::new(&self.scene, self.config.light_selection);
        }
        Ok(())
    }

    /// Render one sample per pixel into `accum`.
    ///
    /// `iteration` selects the random streams, so distinct iterations give
    /// independent samples and a repeated iteration reproduces its image.
    pub fn render_iteration(&mut self, accum: &mut AccumulationBuffer, iteration: u32) -> Result<(), RenderError> {
        self.refresh()?;
        accum.resize(self.camera.image_width, self.camera.image_height);

        let start = Instant::now();
        let integrator = Integrator::new(&self.scene, &self.accel, &self.lights, &self.config);
        let camera = &self.camera;
        let paths = &mut self.paths;
        let intersections = &mut self.intersections;

        let bounces = with_thread_pool(self.pool.as_ref(), || {
            trace_iteration(&integrator, camera, paths, intersections, accum, iteration)
        });

        log::debug!(
            "Iteration {} finished in {:.2?} ({} bounces)",
            iteration,
            start.elapsed(),
            bounces
        );
        Ok(())
    }

    /// Render `config.iterations` iterations, reporting progress after each.
    ///
    /// Cancellation is checked between iterations; the buffer always holds
    /// whole iterations. Returns the number of iterations rendered.
    pub fn render<F>(&mut self, accum: &mut AccumulationBuffer, mut progress: F) -> Result<u32, RenderError>
    where
        F: FnMut(u32, u32),
    {
        let total = self.config.iterations;
        let start = Instant::now();
        let mut done = 0;

        while done < total {
            if self.cancel.load(Ordering::Relaxed) {
                log::info!("Render cancelled after {}/{} iterations", done, total);
                break;
            }
            let iteration = accum.iterations();
            self.render_iteration(accum, iteration)?;
            done += 1;
            progress(done, total);
        }

        log::info!("Rendered {} iterations in {:.2?}", done, start.elapsed());
        Ok(done)
    }
}

/// Run one iteration's wavefront. Returns the number of bounces taken.
fn trace_iteration(
    integrator: &Integrator<'_>,
    camera: &Camera,
    paths: &mut Vec<PathState>,
    intersections: &mut Vec<ShadeableIntersection>,
    accum: &mut AccumulationBuffer,
    iteration: u32,
) -> u32 {
    let seed = integrator.config.seed;
    let max_depth = integrator.config.max_depth;

    (0..camera.pixel_count() as u32)
        .into_par_iter()
        .map(|pixel| {
            let mut rng = path_rng(seed, iteration, pixel, u32::MAX);
            PathState::new(camera.generate_ray(pixel, &mut rng), pixel, max_depth)
        })
        .collect_into_vec(paths);

    let mut active = paths.len();
    let mut bounces = 0;
    while active > 0 {
        let live = &mut paths[..active];

        live.par_iter()
            .map(|path| integrator.accel.intersect(integrator.scene, &path.ray))
            .collect_into_vec(intersections);

        if integrator.config.sort_by_material {
            sort_by_material(live, intersections);
        }

        live.par_iter_mut()
            .zip(intersections.par_iter())
            .for_each(|(path, isect)| {
                let mut rng = path_rng(seed, iteration, path.pixel_index, path.depth);
                integrator.shade(path, isect, &mut rng);
            });

        active = compact_paths(live);
        bounces += 1;
    }

    accum.gather(paths);
    bounces
}

fn with_thread_pool<T: Send>(pool: Option<&rayon::ThreadPool>, f: impl FnOnce() -> T + Send) -> T {
    match pool {
        Some(pool) => pool.install(f),
        None => f(),
    }
}
