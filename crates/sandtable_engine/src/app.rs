//! The application shell: a world plus a schedule, driven tick by tick.
//!
//! `App::init` runs the startup stage once; callers invoke it before the
//! first update, it is never invoked implicitly. `App::update` executes one
//! tick: pre-update, state-transition dispatch, update, post-update,
//! render, then world finalization. A system error propagates out of
//! `update` and aborts the tick before finalization runs.

use sandtable_foundation::{Result, StageId, StateToken};
use sandtable_storage::World;

use crate::schedule::{Guard, Schedule};

/// A world and its schedule, with the per-tick driving loop.
#[derive(Default)]
pub struct App {
    world: World,
    schedule: Schedule,
}

impl App {
    /// Creates an app with an empty world and schedule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            world: World::new(),
            schedule: Schedule::new(),
        }
    }

    /// Returns the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns the world mutably, for setup outside the tick loop.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Appends a system to a stage.
    pub fn add_system(
        &mut self,
        stage: StageId,
        system: impl FnMut(&mut World) -> Result<()> + 'static,
    ) {
        self.schedule.add_system(stage, system);
    }

    /// Appends a guarded system to a stage.
    pub fn add_system_when(
        &mut self,
        stage: StageId,
        system: impl FnMut(&mut World) -> Result<()> + 'static,
        guards: Vec<Guard>,
    ) {
        self.schedule.add_system_when(stage, system, guards);
    }

    /// Returns the memoized stage run when `token` enters `value`.
    pub fn on_enter(&mut self, token: StateToken, value: &str) -> StageId {
        self.schedule.on_enter(token, value)
    }

    /// Returns the memoized stage run when `token` leaves `value`.
    pub fn on_exit(&mut self, token: StateToken, value: &str) -> StageId {
        self.schedule.on_exit(token, value)
    }

    /// Runs the startup stage. Call once, before the first [`App::update`].
    ///
    /// # Errors
    ///
    /// Propagates the first startup-system error.
    pub fn init(&mut self) -> Result<()> {
        self.schedule.run_stage(StageId::STARTUP, &mut self.world)
    }

    /// Runs one-off setup outside the tick loop.
    ///
    /// The escape hatch for work that does not fit a stage, such as loading
    /// done before the loop starts. The closure must not assume any tick
    /// ordering; effects become visible to systems on the next tick. Work
    /// driven from an async runtime follows the same rule: each completed
    /// continuation re-enters the world through a fresh `bootstrap` call,
    /// and its effects land on a later tick, never mid-tick.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn bootstrap(&mut self, f: impl FnOnce(&mut World) -> Result<()>) -> Result<()> {
        f(&mut self.world)
    }

    /// Executes one tick.
    ///
    /// Stage order: pre-update, state-transition dispatch (exit then enter
    /// per dirty state), update, post-update, render. Finalization then
    /// applies deferred despawns, expires channel items, and rotates the
    /// change-tracking buffers.
    ///
    /// # Errors
    ///
    /// Propagates the first system error; the tick aborts and finalization
    /// does not run.
    pub fn update(&mut self) -> Result<()> {
        self.schedule
            .run_stage(StageId::PRE_UPDATE, &mut self.world)?;
        self.dispatch_transitions()?;
        self.schedule.run_stage(StageId::UPDATE, &mut self.world)?;
        self.schedule
            .run_stage(StageId::POST_UPDATE, &mut self.world)?;
        self.schedule.run_stage(StageId::RENDER, &mut self.world)?;
        self.world.finalize_tick();
        Ok(())
    }

    /// Dispatches enter/exit stages for every state made dirty since the
    /// last dispatch.
    ///
    /// Transitions requested by systems running inside this dispatch stay
    /// dirty and surface on the next tick.
    fn dispatch_transitions(&mut self) -> Result<()> {
        let transitions = self.world.take_state_transitions();
        for transition in transitions {
            if let Some(previous) = &transition.previous {
                let stage = self.schedule.on_exit(transition.token, previous);
                self.schedule.run_stage(stage, &mut self.world)?;
            }
            let stage = self.schedule.on_enter(transition.token, &transition.current);
            self.schedule.run_stage(stage, &mut self.world)?;
        }
        Ok(())
    }
}
