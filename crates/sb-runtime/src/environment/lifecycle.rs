use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use regex::Regex;
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Position, Scope, AST, FLOAT, INT};
use sb_core::{
    BoundTypeInfo, BridgeError, BridgeValue, EnvironmentSnapshot, InstrumentationSink,
    LifecycleState, NullSink, OwnershipMode, SlotInfo,
};

static NEXT_INCARNATION: AtomicU64 = AtomicU64::new(1);

pub const DEFAULT_PRESSURE_THRESHOLD: usize = 64;
pub const DEFAULT_SWEEP_BATCH: usize = 8;

#[derive(Clone)]
pub struct EnvironmentOptions {
    pub instrumentation: Option<Rc<dyn InstrumentationSink>>,
    pub pressure_threshold: usize,
    pub sweep_batch: usize,
    pub strict_variables: bool,
    /// When false, the engine starts without its standard library. Bound
    /// values, callables, and collection behave the same either way.
    pub open_libraries: bool,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            instrumentation: None,
            pressure_threshold: DEFAULT_PRESSURE_THRESHOLD,
            sweep_batch: DEFAULT_SWEEP_BATCH,
            strict_variables: true,
            open_libraries: true,
        }
    }
}

/// Owns one incarnation of the embedded script engine together with the
/// boundary state bound to it: the root table, the type registry, and the
/// heap of host values visible to scripts. Dropping the environment (or
/// calling [`Environment::teardown`]) finalizes every owned value exactly
/// once and leaves borrowed host objects untouched.
pub struct Environment {
    engine: Engine,
    ast: Option<AST>,
    roots: BTreeMap<String, Dynamic>,
    heap: Rc<RefCell<BoundaryHeap>>,
    registry: Rc<RefCell<TypeRegistry>>,
    sink: Rc<dyn InstrumentationSink>,
    bound_functions: BTreeSet<String>,
    incarnation: u64,
    state: LifecycleState,
}

impl Environment {
    pub fn new(options: EnvironmentOptions) -> Result<Self, BridgeError> {
        if options.pressure_threshold == 0 || options.sweep_batch == 0 {
            return Err(BridgeError::new(
                "ENV_OPTIONS_INVALID",
                "pressure_threshold and sweep_batch must be at least 1.",
            ));
        }

        let sink: Rc<dyn InstrumentationSink> = options
            .instrumentation
            .unwrap_or_else(|| Rc::new(NullSink));
        let incarnation = NEXT_INCARNATION.fetch_add(1, Ordering::Relaxed);

        let mut engine = if options.open_libraries {
            Engine::new()
        } else {
            Engine::new_raw()
        };
        engine.set_strict_variables(options.strict_variables);
        engine.register_type_with_name::<ScriptHandle>("BoundValue");

        let heap = BoundaryHeap::new(
            incarnation,
            Rc::clone(&sink),
            options.pressure_threshold,
            options.sweep_batch,
        );

        log::debug!("environment incarnation {} active", incarnation);
        Ok(Self {
            engine,
            ast: None,
            roots: BTreeMap::new(),
            heap: Rc::new(RefCell::new(heap)),
            registry: Rc::new(RefCell::new(TypeRegistry::default())),
            sink,
            bound_functions: BTreeSet::new(),
            incarnation,
            state: LifecycleState::Active,
        })
    }

    pub fn with_defaults() -> Result<Self, BridgeError> {
        Self::new(EnvironmentOptions::default())
    }

    pub fn incarnation(&self) -> u64 {
        self.incarnation
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn ensure_active(&self) -> Result<(), BridgeError> {
        match self.state {
            LifecycleState::Active => Ok(()),
            LifecycleState::Uninitialized | LifecycleState::TornDown => Err(BridgeError::new(
                "ENV_TORN_DOWN",
                "Environment is not active.",
            )),
        }
    }

    /// Forces the `Active -> TornDown` transition without waiting for
    /// `Drop`. Every still-live owned or copied value is finalized here,
    /// whether or not the script side could still reach it; borrowed
    /// values are released without running any destructor. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        self.state = LifecycleState::TornDown;
        self.roots.clear();
        self.ast = None;

        let drained = self.heap.borrow_mut().drain();
        let finalized = finalize_slots(drained);
        log::debug!(
            "environment incarnation {} torn down, {} slots finalized",
            self.incarnation,
            finalized
        );
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn bound_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("bound name regex must compile")
    })
}

fn ensure_valid_name(name: &str) -> Result<(), BridgeError> {
    if bound_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(BridgeError::new(
            "BIND_NAME_INVALID",
            format!("\"{}\" is not a valid bound name.", name),
        ))
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn new_rejects_zero_pressure_threshold() {
        let error = Environment::new(EnvironmentOptions {
            pressure_threshold: 0,
            ..EnvironmentOptions::default()
        })
        .expect_err("zero pressure threshold should fail");
        assert_eq!(error.code, "ENV_OPTIONS_INVALID");
    }

    #[test]
    fn new_rejects_zero_sweep_batch() {
        let error = Environment::new(EnvironmentOptions {
            sweep_batch: 0,
            ..EnvironmentOptions::default()
        })
        .expect_err("zero sweep batch should fail");
        assert_eq!(error.code, "ENV_OPTIONS_INVALID");
    }

    #[test]
    fn incarnations_are_unique_across_instances() {
        let first = Environment::with_defaults().expect("environment should build");
        let second = Environment::with_defaults().expect("environment should build");
        assert_ne!(first.incarnation(), second.incarnation());
    }

    #[test]
    fn teardown_moves_to_torn_down_and_rejects_operations() {
        let mut env = Environment::with_defaults().expect("environment should build");
        assert_eq!(env.state(), LifecycleState::Active);

        env.teardown();
        assert_eq!(env.state(), LifecycleState::TornDown);

        let error = env
            .bind_type::<u32>("Counter")
            .expect_err("bind after teardown should fail");
        assert_eq!(error.code, "ENV_TORN_DOWN");

        let error = env
            .eval("1 + 1")
            .expect_err("eval after teardown should fail");
        assert_eq!(error.code, "ENV_TORN_DOWN");

        let error = env
            .collect(true)
            .expect_err("collect after teardown should fail");
        assert_eq!(error.code, "ENV_TORN_DOWN");

        // Idempotent: a second teardown has nothing left to finalize.
        env.teardown();
        assert_eq!(env.state(), LifecycleState::TornDown);
    }

    #[test]
    fn environments_without_libraries_still_bridge_values() {
        let mut env = Environment::new(EnvironmentOptions {
            open_libraries: false,
            ..EnvironmentOptions::default()
        })
        .expect("environment should build");

        env.set_value("t", Offer::owned(5i64)).expect("set owned");
        assert_eq!(env.eval("1 + 1").expect("eval"), BridgeValue::Number(2.0));
        env.remove("t").expect("remove");
        assert_eq!(env.collect(true).expect("collect"), 1);
    }

    #[test]
    fn invalid_bound_names_are_rejected() {
        let mut env = Environment::with_defaults().expect("environment should build");
        let error = env
            .bind_type::<u32>("not a name")
            .expect_err("space in name should fail");
        assert_eq!(error.code, "BIND_NAME_INVALID");

        let error = env
            .set_value("1bad", Offer::owned(3u32))
            .expect_err("leading digit should fail");
        assert_eq!(error.code, "BIND_NAME_INVALID");
    }
}
