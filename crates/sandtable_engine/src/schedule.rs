//! Stage-ordered system scheduling.
//!
//! A schedule holds an ordered list of systems per stage. Execution order
//! within a stage is registration order; there is no dependency inference
//! or reordering. Each system may carry guard predicates that are
//! re-evaluated against the world every tick and short-circuit on the
//! first false.
//!
//! Besides the built-in stages, the schedule mints dynamic stage ids for
//! state enter/exit dispatch. Those ids are memoized per (state token,
//! value) pair and owned by this schedule instance, so two schedules in
//! one process stay isolated.

use std::collections::HashMap;

use sandtable_foundation::{ErrorContext, Result, StageId, StateToken};
use sandtable_storage::World;

/// A system: a mutable closure run against the world at most once per tick.
pub type System = Box<dyn FnMut(&mut World) -> Result<()>>;

/// A guard predicate: read-only, evaluated before its system each tick.
pub type Guard = Box<dyn Fn(&World) -> bool>;

/// One registered system and its guards.
struct SystemEntry {
    system: System,
    guards: Vec<Guard>,
}

/// Ordered per-stage system lists plus memoized transition stages.
pub struct Schedule {
    stages: HashMap<StageId, Vec<SystemEntry>>,
    enter_stages: HashMap<(StateToken, String), StageId>,
    exit_stages: HashMap<(StateToken, String), StageId>,
    next_dynamic: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    /// Creates an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
            enter_stages: HashMap::new(),
            exit_stages: HashMap::new(),
            next_dynamic: StageId::DYNAMIC_BASE,
        }
    }

    /// Appends a system to a stage's ordered list.
    pub fn add_system(
        &mut self,
        stage: StageId,
        system: impl FnMut(&mut World) -> Result<()> + 'static,
    ) {
        self.add_system_when(stage, system, Vec::new());
    }

    /// Appends a guarded system to a stage's ordered list.
    ///
    /// The system runs only when every guard returns true that tick; guards
    /// are checked in order and stop at the first false.
    pub fn add_system_when(
        &mut self,
        stage: StageId,
        system: impl FnMut(&mut World) -> Result<()> + 'static,
        guards: Vec<Guard>,
    ) {
        self.stages.entry(stage).or_default().push(SystemEntry {
            system: Box::new(system),
            guards,
        });
    }

    /// Returns the stage dispatched when `token` enters `value`.
    ///
    /// Memoized: repeated calls for the same pair return the same stage id.
    pub fn on_enter(&mut self, token: StateToken, value: &str) -> StageId {
        if let Some(&stage) = self.enter_stages.get(&(token, value.to_owned())) {
            return stage;
        }
        let stage = self.mint_dynamic();
        self.enter_stages.insert((token, value.to_owned()), stage);
        stage
    }

    /// Returns the stage dispatched when `token` leaves `value`. Memoized
    /// like [`Schedule::on_enter`].
    pub fn on_exit(&mut self, token: StateToken, value: &str) -> StageId {
        if let Some(&stage) = self.exit_stages.get(&(token, value.to_owned())) {
            return stage;
        }
        let stage = self.mint_dynamic();
        self.exit_stages.insert((token, value.to_owned()), stage);
        stage
    }

    /// Runs one stage's systems in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first system error, annotated with the stage and tick;
    /// later systems in the stage do not run.
    pub fn run_stage(&mut self, stage: StageId, world: &mut World) -> Result<()> {
        let Some(entries) = self.stages.get_mut(&stage) else {
            return Ok(());
        };
        for entry in entries {
            if entry.guards.iter().all(|guard| guard(world)) {
                (entry.system)(world).map_err(|err| {
                    err.with_context(ErrorContext::new().in_stage(stage.name()).at_tick(world.tick()))
                })?;
            }
        }
        Ok(())
    }

    /// Returns the number of systems registered for a stage.
    #[must_use]
    pub fn system_count(&self, stage: StageId) -> usize {
        self.stages.get(&stage).map_or(0, Vec::len)
    }

    fn mint_dynamic(&mut self) -> StageId {
        let stage = StageId::from_raw(self.next_dynamic);
        self.next_dynamic += 1;
        stage
    }
}

/// Guard builder: true while `token` is in `value`.
#[must_use]
pub fn in_state(token: StateToken, value: &str) -> Guard {
    let value = value.to_owned();
    Box::new(move |world: &World| world.state(token) == Some(value.as_str()))
}
