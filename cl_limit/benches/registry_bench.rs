use std::convert::Infallible;
use std::hint::black_box;

use cl_limit::Backend;
use cl_limit::BackendFuture;
use cl_limit::KeyRegistry;
use cl_limit::Limiter;
use cl_limit::RequestId;
use cl_limit::Semaphore;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use tokio::runtime::Runtime;

struct Noop;

impl Backend<u64> for Noop {
    type Response = u64;
    type Error = Infallible;

    fn execute(&self, _id: RequestId, request: u64) -> BackendFuture<'_, u64, Infallible> {
        Box::pin(async move { Ok(request) })
    }
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

fn bench_semaphore_uncontended(c: &mut Criterion) {
    let semaphore = Semaphore::new(4);

    c.bench_function("semaphore_try_acquire_release", |b| {
        b.iter(|| {
            black_box(semaphore.try_acquire());
            black_box(semaphore.release());
        });
    });
}

fn bench_registry_lock_unlock(c: &mut Criterion) {
    let rt = runtime();
    let registry = KeyRegistry::new(8);

    c.bench_function("registry_lock_drop_single_key", |b| {
        b.iter(|| {
            rt.block_on(async {
                let permit = registry.locker(black_box(7u64)).lock().await;
                drop(permit);
            })
        });
    });

    // Each iteration creates and prunes a fresh entry
    let mut key = 0u64;
    c.bench_function("registry_lock_drop_rotating_keys", |b| {
        b.iter(|| {
            key = key.wrapping_add(1);
            rt.block_on(async {
                let permit = registry.locker(black_box(key)).lock().await;
                drop(permit);
            })
        });
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = runtime();
    let direct = cl_limit::LimiterBuilder::new().classifier(|r: &u64| *r % 16).capacity(4).mode(cl_limit::AdmissionMode::Direct).build(Noop).unwrap();
    let cancelable = Limiter::by_key(|r: &u64| *r % 16, 4, Noop);

    c.bench_function("dispatch_direct", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(rt.block_on(direct.dispatch(n)).unwrap());
        });
    });

    c.bench_function("dispatch_cancelable", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(rt.block_on(cancelable.dispatch(n)).unwrap());
        });
    });
}

criterion_group!(benches, bench_semaphore_uncontended, bench_registry_lock_unlock, bench_dispatch);
criterion_main!(benches);
