include!("lifecycle.rs");
include!("registry.rs");
include!("wrapper.rs");
include!("heap.rs");
include!("shared.rs");
include!("collect.rs");
include!("callable.rs");
include!("values.rs");
include!("eval.rs");
include!("snapshot.rs");
include!("../helpers/rhai_bridge.rs");
include!("tests.rs");
