mod environment;

pub use environment::{
    BoundValue, CallArg, Callable, Environment, EnvironmentOptions, HostRef, Offer, PlainFunction,
    TypeDescriptorHandle,
};
