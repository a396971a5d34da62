//! Interval scene: dispatch sessions, the live instance buffer and
//! interaction state.
//!
//! [`IntervalScene::load`] starts a new dispatch session. Until
//! [`IntervalScene::poll`] swaps the finished buffer in, the previous
//! buffer stays live. Hover, selection and culling edit one instance's
//! dynamic bits on the host and queue the change for a single-element GPU
//! write, drained with [`IntervalScene::take_bit_updates`].

use std::sync::Arc;

use crate::data::Interval;
use crate::dispatch::{DispatchStatus, Dispatcher, SessionId};
use crate::error::DrillscopeError;
use crate::geometry::{build_unit_cylinder, Template};
use crate::instance::{DynamicBits, InstanceAttributeBuffer, RenderFlag};
use crate::options::Options;
use crate::renderer::picking::{PickMap, PickTarget};
use crate::renderer::IntervalMesh;

/// Owns the dispatcher and everything derived from the latest completed
/// session.
pub struct IntervalScene {
    dispatcher: Dispatcher,
    template: Arc<Template>,
    /// Pick map of the session in flight.
    pending: Option<(SessionId, PickMap)>,
    buffer: Option<InstanceAttributeBuffer>,
    pick_map: PickMap,
    hovered: Option<usize>,
    bit_updates: Vec<(usize, DynamicBits)>,
}

impl IntervalScene {
    /// Empty scene configured from `options`.
    #[must_use]
    pub fn new(options: &Options) -> Self {
        Self {
            dispatcher: Dispatcher::new(options),
            template: build_unit_cylinder(options.geometry.radial_segments()),
            pending: None,
            buffer: None,
            pick_map: PickMap::default(),
            hovered: None,
            bit_updates: Vec::new(),
        }
    }

    /// Start solving `intervals`, superseding any load in flight.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::ThreadSpawn`] if a worker cannot start.
    pub fn load(
        &mut self,
        intervals: &[Interval],
    ) -> Result<SessionId, DrillscopeError> {
        let session = self.dispatcher.dispatch(intervals)?;
        self.pending = Some((session, PickMap::from_intervals(intervals)));
        Ok(session)
    }

    /// Non-blocking. Returns `true` exactly once per completed load, when
    /// its buffer has been swapped in.
    pub fn poll(&mut self) -> bool {
        match self.dispatcher.poll() {
            DispatchStatus::Complete { session, buffer } => {
                self.install(session, buffer)
            }
            DispatchStatus::Pending { .. } | DispatchStatus::Idle => false,
        }
    }

    /// Block up to `timeout` for the load in flight.
    pub fn wait(&mut self, timeout: std::time::Duration) -> bool {
        match self.dispatcher.wait(timeout) {
            DispatchStatus::Complete { session, buffer } => {
                self.install(session, buffer)
            }
            DispatchStatus::Pending { .. } | DispatchStatus::Idle => false,
        }
    }

    /// Block up to `timeout` and fail if the load in flight has not been
    /// swapped in by then.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::LoadTimeout`] with the progress reached.
    pub fn wait_loaded(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<(), DrillscopeError> {
        let progress = self.progress();
        if self.wait(timeout) {
            return Ok(());
        }
        let (completed, total) =
            self.progress().or(progress).unwrap_or((0, 0));
        Err(DrillscopeError::LoadTimeout { completed, total })
    }

    fn install(
        &mut self,
        session: SessionId,
        buffer: InstanceAttributeBuffer,
    ) -> bool {
        let Some((pending, pick_map)) = self.pending.take() else {
            return false;
        };
        if pending != session {
            log::debug!(
                "completion for session {} does not match pending {}",
                session.get(),
                pending.get()
            );
            return false;
        }
        self.buffer = Some(buffer);
        self.pick_map = pick_map;
        self.hovered = None;
        self.bit_updates.clear();
        true
    }

    /// Shared template mesh.
    #[must_use]
    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// Latest completed buffer.
    #[must_use]
    pub fn buffer(&self) -> Option<&InstanceAttributeBuffer> {
        self.buffer.as_ref()
    }

    /// `(completed, total)` of the load in flight.
    #[must_use]
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.dispatcher.progress()
    }

    /// Currently hovered instance.
    #[must_use]
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Resolve a picking texel against the live pick map.
    #[must_use]
    pub fn resolve_pick(&self, texel: [u8; 4]) -> PickTarget {
        self.pick_map.resolve(texel)
    }

    /// Move hover to `target`: sets hovered and emissive on it and clears
    /// them on the previous target.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] for an unknown index.
    pub fn set_hovered(
        &mut self,
        target: Option<usize>,
    ) -> Result<(), DrillscopeError> {
        if target == self.hovered {
            return Ok(());
        }
        if let Some(index) = target {
            let _ = self.bits(index)?;
        }
        if let Some(previous) = self.hovered.take() {
            self.update(previous, |bits| {
                bits.without(RenderFlag::Hovered)
                    .without(RenderFlag::Emissive)
            })?;
        }
        if let Some(index) = target {
            self.update(index, |bits| {
                bits.with(RenderFlag::Hovered).with(RenderFlag::Emissive)
            })?;
        }
        self.hovered = target;
        Ok(())
    }

    /// Toggle the selected (scale-up) flag. Returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] for an unknown index.
    pub fn toggle_selected(
        &mut self,
        index: usize,
    ) -> Result<bool, DrillscopeError> {
        let selected = !self.bits(index)?.has(RenderFlag::ScaleUp);
        self.update(index, |bits| bits.toggled(RenderFlag::ScaleUp, selected))?;
        Ok(selected)
    }

    /// Remove an instance from both passes, or restore it.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] for an unknown index.
    pub fn set_culled(
        &mut self,
        index: usize,
        culled: bool,
    ) -> Result<(), DrillscopeError> {
        self.update(index, |bits| bits.toggled(RenderFlag::Culled, culled))
    }

    /// Drain queued `(index, bits)` changes.
    pub fn take_bit_updates(&mut self) -> Vec<(usize, DynamicBits)> {
        std::mem::take(&mut self.bit_updates)
    }

    /// Drain queued changes into `mesh`.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::IndexOutOfRange`] if `mesh` was assembled
    /// from a smaller buffer.
    pub fn flush_bit_updates(
        &mut self,
        mesh: &IntervalMesh,
        queue: &wgpu::Queue,
    ) -> Result<(), DrillscopeError> {
        for (index, bits) in self.take_bit_updates() {
            mesh.update_dynamic_bits(queue, index, bits)?;
        }
        Ok(())
    }

    fn bits(&self, index: usize) -> Result<DynamicBits, DrillscopeError> {
        let buffer = self.buffer.as_ref();
        buffer.and_then(|b| b.dynamic_bits(index)).ok_or(
            DrillscopeError::IndexOutOfRange {
                index,
                capacity: buffer.map_or(0, InstanceAttributeBuffer::capacity),
            },
        )
    }

    fn update(
        &mut self,
        index: usize,
        edit: impl FnOnce(DynamicBits) -> DynamicBits,
    ) -> Result<(), DrillscopeError> {
        let current = self.bits(index)?;
        let next = edit(current);
        if next == current {
            return Ok(());
        }
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.set_dynamic_bits(index, next)?;
        }
        self.bit_updates.push((index, next));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::options::DispatchOptions;

    const WAIT: Duration = Duration::from_secs(20);

    fn options() -> Options {
        Options {
            dispatch: DispatchOptions {
                worker_count: 2,
                idle_timeout_ms: 5_000,
                chunk_size: 4,
            },
            ..Options::default()
        }
    }

    fn intervals(n: u32) -> Vec<Interval> {
        (0..n)
            .map(|k| {
                let x = k as f32;
                Interval::new([x, 0.0, 0.0], [x, 0.0, 5.0], 3.0, k)
            })
            .collect()
    }

    fn loaded(n: u32) -> IntervalScene {
        let mut scene = IntervalScene::new(&options());
        let _ = scene.load(&intervals(n)).unwrap();
        assert!(scene.wait(WAIT));
        scene
    }

    #[test]
    fn poll_reports_completion_once() {
        let mut scene = IntervalScene::new(&options());
        let _ = scene.load(&intervals(10)).unwrap();
        assert!(scene.wait(WAIT));
        assert!(!scene.poll());
        assert_eq!(scene.buffer().unwrap().capacity(), 10);
    }

    #[test]
    fn reload_replaces_buffer() {
        let mut scene = loaded(5);
        let _ = scene.load(&intervals(8)).unwrap();
        assert_eq!(scene.buffer().unwrap().capacity(), 5);
        assert!(scene.wait(WAIT));
        assert_eq!(scene.buffer().unwrap().capacity(), 8);
    }

    #[test]
    fn hover_moves_between_instances() {
        let mut scene = loaded(4);
        scene.set_hovered(Some(1)).unwrap();
        scene.set_hovered(Some(2)).unwrap();
        let buffer = scene.buffer().unwrap();
        let old = buffer.dynamic_bits(1).unwrap();
        let new = buffer.dynamic_bits(2).unwrap();
        assert!(!old.has(RenderFlag::Hovered) && !old.has(RenderFlag::Emissive));
        assert!(new.has(RenderFlag::Hovered) && new.has(RenderFlag::Emissive));

        let updates = scene.take_bit_updates();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[1].0, 1);
        assert_eq!(updates[2], (2, new));
        assert!(scene.take_bit_updates().is_empty());
    }

    #[test]
    fn clearing_hover_restores_bits() {
        let mut scene = loaded(3);
        scene.set_hovered(Some(0)).unwrap();
        scene.set_hovered(None).unwrap();
        assert_eq!(scene.buffer().unwrap().dynamic_bits(0).unwrap().raw(), 0.0);
        assert_eq!(scene.hovered(), None);
    }

    #[test]
    fn selection_toggles_scale_up() {
        let mut scene = loaded(3);
        assert!(scene.toggle_selected(2).unwrap());
        assert!(scene
            .buffer()
            .unwrap()
            .dynamic_bits(2)
            .unwrap()
            .has(RenderFlag::ScaleUp));
        assert!(!scene.toggle_selected(2).unwrap());
        assert_eq!(scene.buffer().unwrap().dynamic_bits(2).unwrap().raw(), 0.0);
    }

    #[test]
    fn cull_sets_bit_six() {
        let mut scene = loaded(2);
        scene.set_culled(1, true).unwrap();
        let bits = scene.buffer().unwrap().dynamic_bits(1).unwrap();
        assert!(bits.has(RenderFlag::Culled));
        assert_eq!(bits.raw(), 64.0);
        // No-op edits queue nothing.
        let _ = scene.take_bit_updates();
        scene.set_culled(1, true).unwrap();
        assert!(scene.take_bit_updates().is_empty());
    }

    #[test]
    fn out_of_range_edits_fail() {
        let mut scene = loaded(2);
        assert!(matches!(
            scene.set_hovered(Some(9)),
            Err(DrillscopeError::IndexOutOfRange { index: 9, capacity: 2 })
        ));
        assert_eq!(scene.hovered(), None);
        assert!(scene.toggle_selected(2).is_err());

        let mut empty = IntervalScene::new(&options());
        assert!(empty.set_culled(0, true).is_err());
    }

    #[test]
    fn unfinished_load_reports_timeout() {
        let mut scene = IntervalScene::new(&Options {
            dispatch: DispatchOptions {
                worker_count: 1,
                idle_timeout_ms: 5_000,
                chunk_size: 64,
            },
            ..Options::default()
        });
        let _ = scene.load(&intervals(200_000)).unwrap();
        match scene.wait_loaded(Duration::ZERO) {
            Err(DrillscopeError::LoadTimeout { completed, total }) => {
                assert_eq!(total, 200_000);
                assert!(completed < total);
            }
            other => panic!("expected a load timeout, got {other:?}"),
        }
        assert!(scene.buffer().is_none());
        scene.wait_loaded(WAIT).unwrap();
        assert_eq!(scene.buffer().unwrap().capacity(), 200_000);
    }

    #[test]
    fn picks_resolve_through_loaded_ids() {
        let scene = loaded(3);
        let texel = crate::instance::encode_pick_id(2)
            .unwrap()
            .map(|c| (c * 255.0).round() as u8);
        assert_eq!(scene.resolve_pick(texel).index(), Some(2));
    }
}
