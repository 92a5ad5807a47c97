use parks::config::{ParksConfig, RetryPolicy, SeedSource};
use parks::errors::{ErrorKind, ParksError, ParksResult};
use parks::record::Record;
use parks::service::ParkService;
use parks::store::memory::InMemoryStoreModule;
use serde_json::json;
use std::backtrace::Backtrace;
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test between `before` and `after`, retrying flaky failures.
///
/// `after` runs even when the test fails. A panic or error in the last
/// attempt fails the test with the collected details.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> ParksResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> ParksResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> ParksResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();
        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    service: ParkService,
    memory: Option<InMemoryStoreModule>,
}

impl TestContext {
    pub fn new(service: ParkService, memory: Option<InMemoryStoreModule>) -> Self {
        Self { service, memory }
    }

    pub fn service(&self) -> ParkService {
        self.service.clone()
    }

    /// The in-memory backend, when the context runs on it.
    pub fn memory(&self) -> Option<&InMemoryStoreModule> {
        self.memory.as_ref()
    }

    /// Number of documents, read through the service.
    pub fn count(&self) -> ParksResult<usize> {
        Ok(self.service.query_all()?.len())
    }
}

pub fn point(name: &str, lon: f64, lat: f64) -> Record {
    Record::from_value(json!({"name": name, "pos": [lon, lat]}))
        .unwrap_or_else(|e| panic!("invalid test record: {}", e))
}

/// Three points: one at (5, 5), one at (50, 50) and one at (-20, 30).
pub fn three_points() -> Vec<Record> {
    vec![
        point("five", 5.0, 5.0),
        point("fifty", 50.0, 50.0),
        point("elsewhere", -20.0, 30.0),
    ]
}

pub fn test_config(seed: SeedSource) -> ParksConfig {
    ParksConfig::builder()
        .retry_policy(RetryPolicy::new(5, Duration::from_millis(1)))
        .seed_source(seed)
        .build()
}

/// Context on the given in-memory store, regardless of enabled features.
pub fn create_memory_context(module: InMemoryStoreModule, seed: SeedSource) -> ParksResult<TestContext> {
    let service = ParkService::builder()
        .config(test_config(seed))
        .load_module(module.clone())
        .build()?;
    Ok(TestContext::new(service, Some(module)))
}

#[cfg(not(feature = "mongo"))]
pub fn create_context_with(seed: SeedSource) -> ParksResult<TestContext> {
    create_memory_context(InMemoryStoreModule::new(), seed)
}

#[cfg(feature = "mongo")]
pub fn create_context_with(seed: SeedSource) -> ParksResult<TestContext> {
    use parks_mongo_adapter::MongoModule;

    let uri = std::env::var("PARKS_TEST_DB_URI").map_err(|_| {
        ParksError::new(
            "PARKS_TEST_DB_URI must name a MongoDB deployment for the mongo suite",
            ErrorKind::ConfigError,
        )
    })?;
    // one collection per context so suites can run in parallel
    let collection = format!("parkpoints_{}", uuid::Uuid::new_v4().simple());
    let config = ParksConfig::builder()
        .connection_string(&uri)
        .collection_name(&collection)
        .retry_policy(RetryPolicy::new(5, Duration::from_millis(100)))
        .seed_source(seed)
        .build();
    let module = MongoModule::from_parks_config(&config)
        .server_selection_timeout(Duration::from_secs(2))
        .build()?;
    let service = ParkService::builder()
        .config(config)
        .load_module(module)
        .build()?;
    Ok(TestContext::new(service, None))
}

/// Context seeded with [`three_points`].
pub fn create_test_context() -> ParksResult<TestContext> {
    create_context_with(SeedSource::Records(three_points()))
}

/// Context seeded with the built-in park dataset.
pub fn create_dataset_context() -> ParksResult<TestContext> {
    create_context_with(SeedSource::Embedded)
}

/// Drops the collection and closes the connection.
pub fn cleanup(ctx: TestContext) -> ParksResult<()> {
    let service = ctx.service();
    if let Err(e) = service.flush() {
        eprintln!("Warning: Failed to flush collection: {:?}", e);
    }
    service.shutdown()
}

/// Fails unless `err` has the expected kind.
pub fn expect_kind(err: &ParksError, kind: ErrorKind) -> ParksResult<()> {
    if err.kind() == &kind {
        Ok(())
    } else {
        Err(ParksError::new_with_cause(
            &format!("expected {} but got {}", kind, err.kind()),
            ErrorKind::InternalError,
            err.clone(),
        ))
    }
}
