use std::rc::Rc;

pub use sb_core::{
    BoundTypeInfo, BridgeError, BridgeValue, CountingSink, EnvironmentSnapshot,
    InstrumentationSink, LifecycleState, NullSink, OwnershipMode, SlotInfo,
};
pub use sb_runtime::{
    BoundValue, CallArg, Callable, Environment, EnvironmentOptions, HostRef, Offer,
    TypeDescriptorHandle,
};

/// One-call constructor for the common embedding case: default collector
/// tuning, no instrumentation.
pub fn environment_with_defaults() -> Result<Environment, BridgeError> {
    Environment::with_defaults()
}

/// Environment wired to a [`CountingSink`], for callers that want to
/// observe construction/finalization totals without threading options
/// through by hand.
pub fn counting_environment() -> Result<(Environment, Rc<CountingSink>), BridgeError> {
    let sink = Rc::new(CountingSink::new());
    let env = Environment::new(EnvironmentOptions {
        instrumentation: Some(Rc::clone(&sink) as Rc<dyn InstrumentationSink>),
        ..EnvironmentOptions::default()
    })?;
    Ok((env, sink))
}
