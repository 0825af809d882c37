//! Frame scheduling for fieldlab simulations.
//!
//! The [`FrameScheduler`] owns a simulation and orders its work per
//! animation beat. It is driven by injected `Instant` ticks, so the host's
//! display-refresh callback is just one possible tick source; tests drive
//! it manually. Per beat, in strict order: clock uniforms, host-queued
//! interaction events, the update dispatch, then the render submission.
//! The render must observe this beat's state, and the update must observe
//! every event queued no later than this beat.

pub mod probe;

use std::time::Instant;

use fieldgraph::{GraphError, InfluenceEvent, Simulation};

/// Where a scheduler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Running,
    Disposed,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler is not initialized")]
    NotReady,
    #[error("scheduler is disposed")]
    Disposed,
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("render submission failed: {0}")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Render-side collaborator invoked at the end of every beat, after the
/// update dispatch, with the frame's final buffer state.
pub trait RenderSink {
    fn submit(
        &mut self,
        sim: &Simulation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Orders init, compute, and render work for one simulation instance.
pub struct FrameScheduler {
    sim: Option<Simulation>,
    phase: Phase,
    started_at: Option<Instant>,
    last_beat: Option<Instant>,
    pending: Vec<InfluenceEvent>,
    frame: u64,
}

impl FrameScheduler {
    pub fn new(sim: Simulation) -> Self {
        Self {
            sim: Some(sim),
            phase: Phase::Uninitialized,
            started_at: None,
            last_beat: None,
            pending: Vec::new(),
            frame: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds of simulation time at `now`; zero before initialization.
    pub fn elapsed_seconds(&self, now: Instant) -> f32 {
        self.started_at
            .map(|start| now.duration_since(start).as_secs_f32())
            .unwrap_or(0.0)
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }

    pub fn simulation_mut(&mut self) -> Option<&mut Simulation> {
        self.sim.as_mut()
    }

    /// Dispatches the init kernel (and the reset kernel, for demos that
    /// carry one) exactly once. A failure here is fatal for the instance.
    pub fn initialize(&mut self, now: Instant) -> Result<(), SchedulerError> {
        match self.phase {
            Phase::Uninitialized => {}
            Phase::Disposed => return Err(SchedulerError::Disposed),
            Phase::Ready | Phase::Running => return Ok(()),
        }
        let sim = self.sim.as_mut().ok_or(SchedulerError::Disposed)?;
        if let Err(err) = sim.dispatch_init().and_then(|_| sim.dispatch_reset()) {
            tracing::error!(error = %err, "init dispatch failed; disposing");
            self.dispose();
            return Err(err.into());
        }
        tracing::debug!(elements = sim.element_count(), "scheduler ready");
        self.started_at = Some(now);
        self.phase = Phase::Ready;
        Ok(())
    }

    /// Queues an interaction event for the next beat. Events are applied to
    /// the influence ring strictly before the update dispatch that follows.
    pub fn queue_influence(&mut self, event: InfluenceEvent) {
        if matches!(self.phase, Phase::Disposed) {
            return;
        }
        self.pending.push(event);
    }

    /// Runs one scheduling beat. Any error disposes the scheduler and is
    /// surfaced to the caller; there is no automatic retry.
    pub fn beat(&mut self, now: Instant, sink: &mut dyn RenderSink) -> Result<(), SchedulerError> {
        match self.phase {
            Phase::Ready | Phase::Running => {}
            Phase::Uninitialized => return Err(SchedulerError::NotReady),
            Phase::Disposed => return Err(SchedulerError::Disposed),
        }
        let time = self.elapsed_seconds(now);
        let delta = self
            .last_beat
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_beat = Some(now);

        let sim = self.sim.as_mut().ok_or(SchedulerError::Disposed)?;
        sim.set_clock(time, delta);
        for event in self.pending.drain(..) {
            sim.push_influence(event);
        }
        if let Err(err) = sim.dispatch_update() {
            tracing::error!(error = %err, "update dispatch failed; disposing");
            self.dispose();
            return Err(err.into());
        }
        if let Err(err) = sink.submit(self.sim.as_ref().ok_or(SchedulerError::Disposed)?) {
            tracing::error!(error = %err, "render submission failed; disposing");
            self.dispose();
            return Err(SchedulerError::Render(err));
        }
        self.phase = Phase::Running;
        self.frame += 1;
        Ok(())
    }

    /// Releases the simulation and stops scheduling. Idempotent.
    pub fn dispose(&mut self) {
        self.sim = None;
        self.pending.clear();
        self.phase = Phase::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldgraph::{
        ComponentWidth, Expr, InfluenceBinding, InfluenceRingBuffer, KernelBuilder, SimContext,
        StateBufferStore, UniformValue, DELTA_TIME_UNIFORM, TIME_UNIFORM,
    };
    use glam::Vec2;
    use std::time::Duration;

    /// Minimal simulation: init marks every element, update accumulates the
    /// time uniform plus the live influence count.
    fn test_sim() -> Simulation {
        let mut store = StateBufferStore::new(4);
        let marker = store.allocate("marker", ComponentWidth::Scalar, 4).unwrap();
        let total = store.allocate("total", ComponentWidth::Scalar, 4).unwrap();
        let mut ctx = SimContext::new();
        ctx.declare(TIME_UNIFORM, UniformValue::Float(0.0))
            .declare(DELTA_TIME_UNIFORM, UniformValue::Float(0.0))
            .declare("influences", UniformValue::Vec2Array(vec![Vec2::ZERO; 3]))
            .declare("influence_count", UniformValue::Float(0.0));

        let mut init = KernelBuilder::new("init");
        init.add_assign(marker, 1.0);
        let init = init.build(&store, &ctx).unwrap();

        let mut update = KernelBuilder::new("update");
        update.add_assign(
            total,
            Expr::uniform(TIME_UNIFORM) + Expr::uniform("influence_count"),
        );
        let update = update.build(&store, &ctx).unwrap();

        Simulation::new(store, ctx, init, update).with_influences(
            InfluenceRingBuffer::new(3),
            InfluenceBinding {
                list: "influences".into(),
                count: "influence_count".into(),
            },
        )
    }

    struct RecordingSink {
        frames: Vec<(f32, f32)>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { frames: Vec::new() }
        }
    }

    impl RenderSink for RecordingSink {
        fn submit(
            &mut self,
            sim: &Simulation,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let total = sim.store().handle("total").unwrap();
            let time = sim.context().get_float(TIME_UNIFORM).unwrap();
            self.frames.push((time, sim.store().attribute_view(total)[0]));
            Ok(())
        }
    }

    struct FailingSink;

    impl RenderSink for FailingSink {
        fn submit(
            &mut self,
            _sim: &Simulation,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("device lost".into())
        }
    }

    #[test]
    fn beat_before_initialize_is_rejected() {
        let mut scheduler = FrameScheduler::new(test_sim());
        let mut sink = RecordingSink::new();
        let err = scheduler.beat(Instant::now(), &mut sink).unwrap_err();
        assert!(matches!(err, SchedulerError::NotReady));
    }

    #[test]
    fn initialize_runs_init_exactly_once() {
        let mut scheduler = FrameScheduler::new(test_sim());
        let now = Instant::now();
        scheduler.initialize(now).unwrap();
        scheduler.initialize(now).unwrap();
        let sim = scheduler.simulation().unwrap();
        let marker = sim.store().handle("marker").unwrap();
        assert_eq!(sim.store().attribute_view(marker), &[1.0; 4]);
        assert_eq!(scheduler.phase(), Phase::Ready);
    }

    #[test]
    fn render_observes_same_beat_state() {
        let mut scheduler = FrameScheduler::new(test_sim());
        let mut sink = RecordingSink::new();
        let start = Instant::now();
        scheduler.initialize(start).unwrap();
        scheduler.beat(start + Duration::from_secs(1), &mut sink).unwrap();
        scheduler.beat(start + Duration::from_secs(2), &mut sink).unwrap();
        // The sink saw each beat's freshly updated accumulator, not the
        // previous frame's.
        assert_eq!(sink.frames, vec![(1.0, 1.0), (2.0, 3.0)]);
        assert_eq!(scheduler.phase(), Phase::Running);
        assert_eq!(scheduler.frame(), 2);
    }

    #[test]
    fn queued_events_apply_before_the_update() {
        let mut scheduler = FrameScheduler::new(test_sim());
        let mut sink = RecordingSink::new();
        let start = Instant::now();
        scheduler.initialize(start).unwrap();
        scheduler.queue_influence(InfluenceEvent {
            location: 1.0,
            timestamp: 0.0,
        });
        scheduler.queue_influence(InfluenceEvent {
            location: 2.0,
            timestamp: 0.0,
        });
        scheduler.beat(start + Duration::from_secs(1), &mut sink).unwrap();
        let sim = scheduler.simulation().unwrap();
        assert_eq!(sim.ring().active_count(), 2);
        // time 1.0 + two live events = 3.0 on the first beat.
        assert_eq!(sink.frames, vec![(1.0, 3.0)]);
    }

    #[test]
    fn sink_failure_disposes_and_surfaces() {
        let mut scheduler = FrameScheduler::new(test_sim());
        let start = Instant::now();
        scheduler.initialize(start).unwrap();
        let err = scheduler
            .beat(start + Duration::from_secs(1), &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Render(_)));
        assert_eq!(scheduler.phase(), Phase::Disposed);
        assert!(scheduler.simulation().is_none());

        // No further beats are scheduled once disposed.
        let mut sink = RecordingSink::new();
        let err = scheduler
            .beat(start + Duration::from_secs(2), &mut sink)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Disposed));
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut scheduler = FrameScheduler::new(test_sim());
        scheduler.initialize(Instant::now()).unwrap();
        scheduler.dispose();
        scheduler.dispose();
        assert_eq!(scheduler.phase(), Phase::Disposed);
    }
}
