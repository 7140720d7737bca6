//! Off-thread distance/level computation.
//!
//! The scheduler hands a snapshot (entity positions + observation point) to
//! a worker over a channel and drains stamped results on a later cycle,
//! applying transitions synchronously on the thread that owns renderable
//! state. Only the distance/level math runs off-thread; swapping never does.
//!
//! Cancellation is generation-based: bumping the minimum valid batch id
//! makes every in-flight result stale, and stale results are simply
//! discarded on drain — the affected entities are still registered and get
//! picked up by a later cycle.

use std::thread::JoinHandle;

use glam::Vec3;
use tracing::debug;

use strata_scene::EntityId;

use crate::policy::LodPolicy;

/// A self-contained computation batch. Owns its data so the worker needs no
/// locks on scheduler state.
pub struct DistanceTask {
    /// Generation stamp used to detect stale results.
    pub batch_id: u64,
    /// Observation point at snapshot time.
    pub observation_point: Vec3,
    /// Entity positions at snapshot time.
    pub positions: Vec<(EntityId, Vec3)>,
}

/// The result of a completed batch: per-entity distance and target level,
/// sorted ascending by distance (closest first).
pub struct DistanceResult {
    /// Stamp of the task this result answers.
    pub batch_id: u64,
    /// `(entity, distance, target level)` triples, closest first.
    pub levels: Vec<(EntityId, f32, usize)>,
}

/// Worker-backed distance/level computation.
pub struct DistancePipeline {
    task_sender: Option<crossbeam_channel::Sender<DistanceTask>>,
    result_receiver: crossbeam_channel::Receiver<DistanceResult>,
    worker_handles: Vec<JoinHandle<()>>,
    next_batch: u64,
    min_valid_batch: u64,
}

impl DistancePipeline {
    /// Spawn `worker_count` computation threads sharing a clone of the
    /// selection policy.
    #[must_use]
    pub fn new(policy: LodPolicy, worker_count: usize) -> Self {
        let (task_tx, task_rx) = crossbeam_channel::bounded::<DistanceTask>(worker_count.max(1) * 2);
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let mut handles = Vec::with_capacity(worker_count.max(1));
        for _ in 0..worker_count.max(1) {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let policy = policy.clone();

            handles.push(std::thread::spawn(move || {
                while let Ok(task) = rx.recv() {
                    let mut levels: Vec<(EntityId, f32, usize)> = task
                        .positions
                        .iter()
                        .map(|&(id, pos)| {
                            let distance = (pos - task.observation_point).length();
                            (id, distance, policy.select_level(distance))
                        })
                        .collect();
                    levels.sort_by(|a, b| {
                        a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
                    });
                    let _ = tx.send(DistanceResult {
                        batch_id: task.batch_id,
                        levels,
                    });
                }
            }));
        }

        Self {
            task_sender: Some(task_tx),
            result_receiver: result_rx,
            worker_handles: handles,
            next_batch: 0,
            min_valid_batch: 0,
        }
    }

    /// Submit a snapshot. Returns the stamped batch id, or `None` when the
    /// pipeline is shut down or its queue is full (the entities stay
    /// registered and are retried next cycle).
    pub fn submit(
        &mut self,
        observation_point: Vec3,
        positions: Vec<(EntityId, Vec3)>,
    ) -> Option<u64> {
        let sender = self.task_sender.as_ref()?;
        let batch_id = self.next_batch;
        let task = DistanceTask {
            batch_id,
            observation_point,
            positions,
        };
        if sender.try_send(task).is_err() {
            return None;
        }
        self.next_batch += 1;
        Some(batch_id)
    }

    /// Drain completed results, dropping any whose batch was cancelled.
    /// Called once per cycle on the owning thread.
    pub fn drain(&mut self) -> Vec<DistanceResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_receiver.try_recv() {
            if result.batch_id < self.min_valid_batch {
                debug!(batch = result.batch_id, "discarding cancelled batch result");
                continue;
            }
            results.push(result);
        }
        results
    }

    /// Cancel every in-flight batch. Their results will be discarded on
    /// drain; no scheduler state is touched.
    pub fn cancel_in_flight(&mut self) {
        self.min_valid_batch = self.next_batch;
    }

    /// Shut down the workers: close the task channel, then join.
    pub fn shutdown(&mut self) {
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for DistancePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for_results(pipeline: &mut DistancePipeline) -> Vec<DistanceResult> {
        let start = Instant::now();
        loop {
            let results = pipeline.drain();
            if !results.is_empty() {
                return results;
            }
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "timed out waiting for batch result"
            );
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn wait_for_queued(pipeline: &DistancePipeline, n: usize) {
        let start = Instant::now();
        while pipeline.result_receiver.len() < n {
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "timed out waiting for worker"
            );
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// A batch produces per-entity levels sorted closest-first.
    #[test]
    fn test_batch_levels_sorted_closest_first() {
        let mut pipeline = DistancePipeline::new(LodPolicy::linear(100.0, 4, 1.0), 1);
        let batch = vec![
            (EntityId(1), Vec3::new(60.0, 0.0, 0.0)),
            (EntityId(2), Vec3::new(10.0, 0.0, 0.0)),
            (EntityId(3), Vec3::new(40.0, 0.0, 0.0)),
        ];
        pipeline.submit(Vec3::ZERO, batch).unwrap();
        let results = wait_for_results(&mut pipeline);
        assert_eq!(results.len(), 1);
        let levels = &results[0].levels;
        assert_eq!(levels[0].0, EntityId(2));
        assert_eq!(levels[1].0, EntityId(3));
        assert_eq!(levels[2].0, EntityId(1));
        // Distance 40 with max 100 and 4 levels is level 1.
        assert_eq!(levels[1].2, 1);
    }

    /// Cancelled batches are discarded on drain.
    #[test]
    fn test_cancelled_batch_discarded() {
        let mut pipeline = DistancePipeline::new(LodPolicy::linear(100.0, 4, 1.0), 1);
        pipeline
            .submit(Vec3::ZERO, vec![(EntityId(1), Vec3::X)])
            .unwrap();
        pipeline.cancel_in_flight();

        // Wait for the worker to finish, then confirm drain drops it.
        wait_for_queued(&pipeline, 1);
        assert!(pipeline.drain().is_empty());

        // A batch submitted after cancellation is delivered normally.
        pipeline
            .submit(Vec3::ZERO, vec![(EntityId(2), Vec3::X)])
            .unwrap();
        let results = wait_for_results(&mut pipeline);
        assert_eq!(results[0].levels[0].0, EntityId(2));
    }

    /// Shutdown joins the workers; later submits are refused.
    #[test]
    fn test_shutdown_refuses_submits() {
        let mut pipeline = DistancePipeline::new(LodPolicy::linear(100.0, 2, 1.0), 2);
        pipeline.shutdown();
        assert!(pipeline.submit(Vec3::ZERO, Vec::new()).is_none());
    }
}
