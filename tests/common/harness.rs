//! tests/common/harness.rs
use backflow::{Config, Emitter, EventStream, Payload};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "backflow=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::FULL)
            .with_test_writer()
            .init();
    });
}

/// An emitter wired to an event stream through its named pause/resume methods.
pub struct TestHarness<A> {
    pub source: Arc<Emitter<A>>,
    pub stream: EventStream<Payload<A>>,
}

impl<A> TestHarness<A>
where
    A: std::fmt::Debug + Clone + Send + Sync + 'static,
{
    pub fn new(high_water_mark: usize, low_water_mark: usize) -> Self {
        init_tracing();
        let source = Arc::new(Emitter::new());
        let config = Config::builder("data", "end")
            .high_water_mark(high_water_mark)
            .low_water_mark(low_water_mark)
            .pause_method("pause")
            .resume_method("resume")
            .build()
            .unwrap();
        let stream = EventStream::new(Arc::clone(&source), config).unwrap();
        Self { source, stream }
    }
}
