#![allow(dead_code)]

pub use tlsharness_test_utils::builders;
pub use tlsharness_test_utils::script_provider::ScriptProvider;
pub use tlsharness_test_utils::{init_tracing, payload, with_timeout};
