use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use flate2::write::ZlibEncoder;
use flate2::read::ZlibDecoder;
use flate2::Compression;

use super::execution::Executor;
use super::snapshot::{PredatorSample, TargetingSnapshot};
use super::spatial_grid::SpatialGrid;
use super::targeting::resolve_nearest_targets;

pub const CAPTURE_VERSION: u32 = 1;

/// Inputs and results of one nearest-target pass, for offline replay.
///
/// Radii are stored after the global cap was applied, so replay needs no
/// configuration besides the cell size.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TickCapture {
    pub version: u32,
    pub tick: u64,
    pub cell_size: f32,
    pub predator_positions: Vec<Vec2>,
    pub predator_radii: Vec<f32>,
    pub vacant_predators: Vec<u32>,
    pub prey_positions: Vec<Vec2>,
    pub vacant_prey: Vec<u32>,
    pub nearest: Vec<Option<u32>>,
}

fn vacant_slots(len: usize, live: &fixedbitset::FixedBitSet) -> Vec<u32> {
    (0..len).filter(|&i| !live.contains(i)).map(|i| i as u32).collect()
}

impl TickCapture {
    pub fn record(tick: u64, cell_size: f32, snapshot: &TargetingSnapshot, nearest: &[Option<u32>]) -> Self {
        Self {
            version: CAPTURE_VERSION,
            tick,
            cell_size,
            predator_positions: snapshot.predator_positions.clone(),
            predator_radii: snapshot.predator_radii.clone(),
            vacant_predators: vacant_slots(snapshot.predator_count(), &snapshot.predator_live),
            prey_positions: snapshot.prey_positions.clone(),
            vacant_prey: vacant_slots(snapshot.prey_count(), &snapshot.prey_live),
            nearest: nearest.to_vec(),
        }
    }

    /// Rebuild the snapshot this capture was taken from.
    pub fn snapshot(&self) -> TargetingSnapshot {
        let mut snapshot = TargetingSnapshot::default();
        snapshot.reserve(self.predator_positions.len(), self.prey_positions.len());
        for (slot, (&position, &sensing_radius)) in self.predator_positions.iter().zip(&self.predator_radii).enumerate() {
            let sample = (!self.vacant_predators.contains(&(slot as u32))).then_some(PredatorSample { position, sensing_radius });
            // Radii are already capped.
            snapshot.push_predator(sample, f32::INFINITY);
        }
        for (slot, &position) in self.prey_positions.iter().enumerate() {
            snapshot.push_prey((!self.vacant_prey.contains(&(slot as u32))).then_some(position));
        }
        snapshot
    }

    /// Re-run the resolver on the captured inputs.
    pub fn replay(&self, executor: &Executor) -> Vec<Option<u32>> {
        let snapshot = self.snapshot();
        let mut grid = SpatialGrid::with_capacity(self.cell_size, snapshot.prey_count() * 2);
        grid.rebuild(&snapshot.prey_positions, Some(&snapshot.prey_live), executor);
        resolve_nearest_targets(&grid, &snapshot, executor)
    }
}

pub fn save_capture<P: AsRef<Path>>(path: P, capture: &TickCapture) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, capture)?;
    encoder.finish()?.flush()?;
    Ok(())
}

pub fn load_capture<P: AsRef<Path>>(path: P) -> Result<TickCapture, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut decoder = ZlibDecoder::new(reader);
    let capture: TickCapture = bincode::deserialize_from(&mut decoder)?;
    if capture.version != CAPTURE_VERSION {
        return Err(format!("unsupported capture version {}", capture.version).into());
    }
    Ok(capture)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_capture() -> TickCapture {
        let mut rng = fastrand::Rng::with_seed(11);
        let mut snapshot = TargetingSnapshot::default();
        for i in 0..40 {
            let sample = PredatorSample {
                position: Vec2::new(rng.f32() * 100.0, rng.f32() * 100.0),
                sensing_radius: rng.f32() * 25.0,
            };
            snapshot.push_predator((i != 3).then_some(sample), 20.0);
        }
        for i in 0..150 {
            let position = Vec2::new(rng.f32() * 100.0, rng.f32() * 100.0);
            snapshot.push_prey((i % 17 != 0).then_some(position));
        }
        let executor = Executor::sequential();
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&snapshot.prey_positions, Some(&snapshot.prey_live), &executor);
        let nearest = resolve_nearest_targets(&grid, &snapshot, &executor);
        TickCapture::record(9, 4.0, &snapshot, &nearest)
    }

    #[test]
    fn test_replay_reproduces_results() {
        let capture = sample_capture();
        assert_eq!(capture.vacant_predators, vec![3]);
        assert_eq!(capture.nearest[3], None);
        assert_eq!(capture.replay(&Executor::sequential()), capture.nearest);
        assert_eq!(capture.replay(&Executor::parallel(8)), capture.nearest);
    }

    #[test]
    fn test_save_load_round_trip() {
        let capture = sample_capture();
        let path = std::env::temp_dir().join(format!("ecosim_capture_{}.bin", std::process::id()));

        save_capture(&path, &capture).unwrap();
        let loaded = load_capture(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, capture);
        assert_eq!(loaded.replay(&Executor::sequential()), capture.nearest);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("ecosim_capture_does_not_exist.bin");
        assert!(load_capture(&path).is_err());
    }
}
