use parks::config::SeedSource;
use parks::connection::ConnectionState;
use parks::errors::ErrorKind;
use parks::query::BoxQueryParams;
use parks::service::SeedOutcome;
use parks::spatial::SpatialIndex;
use parks::store::memory::{InMemoryDatabase, InMemoryStore, InMemoryStoreModule};
use parks::store::ParkStoreProvider;
use parks_int_test::test_util::{
    cleanup, create_memory_context, create_test_context, expect_kind, run_test, three_points,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[ctor::ctor]
fn init() {
    colog::init();
}

fn seeded() -> SeedSource {
    SeedSource::Records(three_points())
}

#[test]
fn test_concurrent_first_calls_dial_once() {
    run_test(
        || {
            let module = InMemoryStoreModule::with_config()
                .dial_latency(Duration::from_millis(50))
                .build();
            create_memory_context(module, seeded())
        },
        |ctx| {
            let service = ctx.service();
            let num_threads = 10;
            let barrier = Arc::new(Barrier::new(num_threads));

            let handles: Vec<_> = (0..num_threads)
                .map(|_| {
                    let service = service.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        service.query_all().map(|records| records.len())
                    })
                })
                .collect();

            for handle in handles {
                let result = handle.join().expect("query thread panicked");
                assert_eq!(result?, 0);
            }

            let dials = ctx.memory().map(|m| m.in_memory_connector().dial_count());
            assert_eq!(dials, Some(1));
            assert_eq!(service.connection_state(), ConnectionState::Connected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_initialize_seeds_once() {
    run_test(
        || create_memory_context(InMemoryStoreModule::new(), seeded()),
        |ctx| {
            let service = ctx.service();
            // warm the connection so the threads race on seeding only
            service.connection().ensure_connection()?;
            let num_threads = 4;
            let barrier = Arc::new(Barrier::new(num_threads));

            let handles: Vec<_> = (0..num_threads)
                .map(|_| {
                    let service = service.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        service.initialize()
                    })
                })
                .collect();

            let mut seeded = 0;
            for handle in handles {
                if let SeedOutcome::Seeded { .. } = handle.join().expect("init thread panicked")? {
                    seeded += 1;
                }
            }
            assert_eq!(seeded, 1);
            assert_eq!(ctx.count()?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_index_creation_does_not_disrupt_reads() {
    run_test(
        || {
            // documents already present, index not yet built
            let database = InMemoryDatabase::new("parks", "parkpoints");
            InMemoryStore::new(database.clone()).insert_many(three_points())?;
            let module = InMemoryStoreModule::with_config().database(database).build();
            create_memory_context(module, seeded())
        },
        |ctx| {
            let service = ctx.service();
            let database = ctx.memory().map(|m| m.database().clone()).expect("memory backend");
            let num_readers = 4;
            let barrier = Arc::new(Barrier::new(num_readers + 1));

            let indexer = {
                let service = service.clone();
                let database = database.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..50 {
                        database.drop_indexes();
                        let outcome = service.initialize()?;
                        assert_eq!(outcome, SeedOutcome::AlreadySeeded { existing: 3 });
                        assert!(database.has_index(&SpatialIndex::default()));
                    }
                    Ok::<(), parks::errors::ParksError>(())
                })
            };

            let readers: Vec<_> = (0..num_readers)
                .map(|_| {
                    let service = service.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        let params = BoxQueryParams::new(0.0, 0.0, 10.0, 10.0);
                        for _ in 0..200 {
                            assert_eq!(service.query_all()?.len(), 3);
                            let found = service.query_box(&params)?;
                            assert_eq!(found.len(), 1);
                            assert_eq!(
                                found[0].get("name").and_then(|v| v.as_str()),
                                Some("five")
                            );
                        }
                        Ok::<(), parks::errors::ParksError>(())
                    })
                })
                .collect();

            indexer.join().expect("indexer thread panicked")?;
            for reader in readers {
                reader.join().expect("reader thread panicked")?;
            }
            assert_eq!(database.index_count(), 1);
            assert_eq!(ctx.count()?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_retry_then_connect() {
    run_test(
        || {
            let module = InMemoryStoreModule::with_config().failing_dials(4).build();
            create_memory_context(module, seeded())
        },
        |ctx| {
            let service = ctx.service();
            assert_eq!(service.initialize()?, SeedOutcome::Seeded { inserted: 3 });
            let dials = ctx.memory().map(|m| m.in_memory_connector().dial_count());
            assert_eq!(dials, Some(5));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_retry_exhaustion_reports_last_cause() {
    run_test(
        || {
            let module = InMemoryStoreModule::with_config().failing_dials(5).build();
            create_memory_context(module, seeded())
        },
        |ctx| {
            let service = ctx.service();
            let err = match service.initialize() {
                Ok(outcome) => panic!("connected through a dead store: {}", outcome),
                Err(err) => err,
            };
            expect_kind(&err, ErrorKind::ConnectionError)?;
            assert!(err.message().contains("after 5 attempts"));
            let cause = err.cause().map(|c| c.message().to_string()).unwrap_or_default();
            assert!(cause.contains("dial #5"), "unexpected cause: {}", cause);
            assert_eq!(service.connection_state(), ConnectionState::Failed);

            // the next call starts a fresh cycle and the store is up again
            assert_eq!(service.initialize()?, SeedOutcome::Seeded { inserted: 3 });
            assert_eq!(service.connection_state(), ConnectionState::Connected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_validation_never_reaches_store() {
    run_test(
        || create_memory_context(InMemoryStoreModule::new(), seeded()),
        |ctx| {
            let service = ctx.service();
            let module = ctx.memory().cloned().expect("memory backend");

            let mut missing = BoxQueryParams::new(1.0, 1.0, 2.0, 2.0);
            missing.lon1 = None;
            let mut garbage = BoxQueryParams::new(1.0, 1.0, 2.0, 2.0);
            garbage.lat1 = Some("12abc".to_string());
            let bad_limit = BoxQueryParams::new(1.0, 1.0, 2.0, 2.0).with_limit("-1");

            for params in [missing, garbage, bad_limit, BoxQueryParams::default()] {
                let err = match service.query_box(&params) {
                    Ok(_) => panic!("accepted {:?}", params),
                    Err(err) => err,
                };
                assert!(err.is_client_error());
            }
            assert_eq!(module.in_memory_connector().dial_count(), 0);
            assert_eq!(module.database().operation_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_one_shot_initialize_closes_connection() {
    run_test(
        || create_memory_context(InMemoryStoreModule::new(), seeded()),
        |ctx| {
            let observer = ctx.service();
            let outcome = ctx.service().one_shot().initialize()?;
            assert_eq!(outcome, SeedOutcome::Seeded { inserted: 3 });
            assert_eq!(observer.connection_state(), ConnectionState::Disconnected);

            // data stays, and a one-shot flush also closes afterwards
            assert_eq!(ctx.count()?, 3);
            ctx.service().one_shot().flush()?;
            assert_eq!(observer.connection_state(), ConnectionState::Disconnected);
            assert_eq!(ctx.count()?, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_one_shot_closes_connection_on_failure() {
    run_test(
        || create_memory_context(InMemoryStoreModule::new(), SeedSource::File("/nonexistent/parks.json".into())),
        |ctx| {
            let observer = ctx.service();
            let err = match ctx.service().one_shot().initialize() {
                Ok(outcome) => panic!("seeded from a missing file: {}", outcome),
                Err(err) => err,
            };
            expect_kind(&err, ErrorKind::DatasetError)?;
            assert_eq!(observer.connection_state(), ConnectionState::Disconnected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_background_initialization() {
    run_test(
        || {
            let module = InMemoryStoreModule::with_config()
                .dial_latency(Duration::from_millis(20))
                .failing_dials(2)
                .build();
            create_memory_context(module, seeded())
        },
        |ctx| {
            let service = ctx.service();
            let done = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&done);
            let background = service.clone();
            let handle = thread::spawn(move || {
                let outcome = background.initialize();
                flag.store(true, Ordering::SeqCst);
                outcome
            });

            awaitility::at_most(Duration::from_secs(5)).until(|| done.load(Ordering::SeqCst));
            assert!(handle.join().expect("init thread panicked").is_ok());
            assert_eq!(ctx.count()?, 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_query_store_failure_is_query_error() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            service.initialize()?;
            let Some(module) = ctx.memory() else {
                return Ok(());
            };
            module.database().set_available(false);
            let err = match service.query_box(&BoxQueryParams::new(0.0, 0.0, 10.0, 10.0)) {
                Ok(_) => panic!("query succeeded on an unavailable store"),
                Err(err) => err,
            };
            module.database().set_available(true);
            expect_kind(&err, ErrorKind::QueryError)?;
            assert!(!err.is_client_error());
            Ok(())
        },
        cleanup,
    )
}
