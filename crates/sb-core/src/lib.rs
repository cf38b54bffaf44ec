pub mod error;
pub mod instrument;
pub mod ownership;
pub mod snapshot;
pub mod value;

pub use error::BridgeError;
pub use instrument::{CountingSink, InstrumentationSink, NullSink};
pub use ownership::OwnershipMode;
pub use snapshot::{BoundTypeInfo, EnvironmentSnapshot, LifecycleState, SlotInfo};
pub use value::BridgeValue;
