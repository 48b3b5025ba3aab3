use rayon::prelude::*;

use crate::exec::executor::StepExecutor;
use crate::foundation::error::StepError;
use crate::foundation::rng::Rng64;
use crate::job::config::{HydraulicConfig, StepConfig, ThermalConfig};
use crate::terrain::heightmap::Heightmap;

const MAX_DROPLET_SPEED: f32 = 10.0;
const SPAWN_SEED_MIX: u64 = 0xA076_1D64_78BD_642F;

/// Deterministic reference erosion kernels.
///
/// Thermal erosion relaxes slopes steeper than the talus angle; hydraulic erosion traces seeded
/// water droplets down the gradient. Both are pure functions of `(input, config)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceKernels;

impl StepExecutor for ReferenceKernels {
    fn apply(&self, input: &Heightmap, config: &StepConfig) -> Result<Heightmap, StepError> {
        match config {
            StepConfig::Hydraulic(c) => Ok(hydraulic(input, c)),
            StepConfig::Thermal(c) => Ok(thermal(input, c)),
        }
    }
}

/// 4-neighbourhood offsets: left, right, up, down.
const NEIGHBOURS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

fn thermal(input: &Heightmap, c: &ThermalConfig) -> Heightmap {
    let talus = c.talus_angle.to_radians().tan() as f32;
    let rate = c.transfer_rate as f32;
    let w = input.width() as i64;
    let h = input.height() as i64;
    let mut cur = input.clone();

    for _ in 0..c.iterations {
        let src = cur.data();
        // Outflow per cell towards each neighbour, computed from the same snapshot.
        let flows: Vec<[f32; 4]> = (0..src.len())
            .into_par_iter()
            .map(|i| {
                let x = i as i64 % w;
                let y = i as i64 / w;
                let here = src[i];
                let mut excess = [0.0f32; 4];
                let mut total = 0.0f32;
                let mut steepest = 0.0f32;
                for (k, (ox, oy)) in NEIGHBOURS.iter().enumerate() {
                    let (nx, ny) = (x + ox, y + oy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let d = here - src[(ny * w + nx) as usize];
                    if d > talus {
                        excess[k] = d - talus;
                        total += excess[k];
                        steepest = steepest.max(d);
                    }
                }
                if total <= 0.0 {
                    return [0.0; 4];
                }
                let moved = rate * (steepest - talus) * 0.5;
                excess.map(|e| moved * e / total)
            })
            .collect();

        if flows.iter().all(|f| f.iter().all(|&a| a == 0.0)) {
            break;
        }

        let data = cur.data_mut();
        for (i, f) in flows.iter().enumerate() {
            let x = i as i64 % w;
            let y = i as i64 / w;
            for (k, (ox, oy)) in NEIGHBOURS.iter().enumerate() {
                if f[k] == 0.0 {
                    continue;
                }
                let n = ((y + oy) * w + (x + ox)) as usize;
                data[i] -= f[k];
                data[n] += f[k];
            }
        }
    }
    cur
}

fn hydraulic(input: &Heightmap, c: &HydraulicConfig) -> Heightmap {
    let mut hm = input.clone();
    let (w, h) = (hm.width(), hm.height());
    if w < 3 || h < 3 {
        return hm;
    }

    let inertia = c.inertia as f32;
    let erode_rate = c.erosion_rate as f32;
    let deposit_rate = c.deposition_rate as f32;
    let evaporate = c.evaporation_rate as f32;
    let capacity_factor = c.sediment_capacity as f32;
    let min_capacity = c.min_slope as f32;
    let gravity = c.gravity as f32;
    let max_x = (w - 1) as f32;
    let max_y = (h - 1) as f32;

    let mut rng = Rng64::new(c.seed ^ SPAWN_SEED_MIX);
    for _ in 0..c.num_particles {
        let mut px = rng.next_range_f32(0.0, (w - 2) as f32);
        let mut py = rng.next_range_f32(0.0, (h - 2) as f32);
        let (mut dx, mut dy) = (0.0f32, 0.0f32);
        let mut water = c.initial_water as f32;
        let mut speed = c.initial_speed as f32;
        let mut sediment = 0.0f32;

        for _ in 0..c.max_lifetime {
            let (cx, cy) = (px.floor() as u32, py.floor() as u32);
            if cx >= w - 1 || cy >= h - 1 {
                break;
            }
            let here = hm.height_interpolated(px, py);
            let Some((gx, gy)) = hm.gradient(px, py) else {
                break;
            };

            dx = dx * inertia - gx * (1.0 - inertia);
            dy = dy * inertia - gy * (1.0 - inertia);
            let len = (dx * dx + dy * dy).sqrt();
            if len < 1e-4 {
                break;
            }
            dx /= len;
            dy /= len;

            let (nx, ny) = (px + dx, py + dy);
            if nx < 0.0 || ny < 0.0 || nx > max_x || ny > max_y {
                break;
            }
            // Positive when moving downhill.
            let diff = here - hm.height_interpolated(nx, ny);
            let capacity = (diff.max(0.0) * speed * water * capacity_factor).max(min_capacity);

            let cell = hm.at(cx, cy);
            if sediment > capacity || diff < 0.0 {
                let amount = if diff < 0.0 {
                    (-diff).min(sediment)
                } else {
                    (sediment - capacity) * deposit_rate
                };
                let amount = amount.max(0.0);
                sediment -= amount;
                hm.set(cx, cy, cell + amount);
            } else {
                let amount = ((capacity - sediment) * erode_rate).min(diff);
                sediment += amount;
                hm.set(cx, cy, cell - amount);
            }

            speed = (diff.abs() * gravity).sqrt().min(MAX_DROPLET_SPEED);
            water *= 1.0 - evaporate;
            px = nx;
            py = ny;
        }
    }
    hm
}

#[cfg(test)]
#[path = "../../tests/unit/exec/kernels.rs"]
mod tests;
