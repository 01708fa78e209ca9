#![allow(dead_code)]

use dsp5680xx::probe::fake_probe::FakeDsp;
use dsp5680xx::Dsp5680xx;
use tracing_subscriber::EnvFilter;

/// Install a subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A session with a running fake MC56F8013 that has not been polled yet.
pub fn attach() -> (FakeDsp, Dsp5680xx) {
    init_logging();

    let fake = FakeDsp::new();
    let target = Dsp5680xx::attach(Box::new(fake.clone()), "MC56F8013")
        .expect("Failed to attach to the fake target.");
    (fake, target)
}

/// A session with a halted fake MC56F8013.
pub fn halted() -> (FakeDsp, Dsp5680xx) {
    let (fake, mut target) = attach();
    target.halt().expect("Failed to halt the fake target.");
    (fake, target)
}
