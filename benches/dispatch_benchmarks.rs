use criterion::{black_box, criterion_group, criterion_main, Criterion};
use callback_core::{CallbackContext, CallbackHandler, MainLoop};
use std::sync::Arc;
use std::thread;

fn echo() -> callback_core::HandlerRef {
    CallbackHandler::new(|input, out| {
        out.clear();
        out.extend_from_slice(input);
    })
    .into_ref()
}

fn benchmark_invoke_default(c: &mut Criterion) {
    let ctx = CallbackContext::new();
    ctx.set_default("echo", echo());
    let mut out = Vec::with_capacity(64);

    c.bench_function("invoke_default", |b| {
        b.iter(|| ctx.invoke(black_box("echo"), black_box(b"payload"), &mut out))
    });
}

fn benchmark_invoke_override(c: &mut Criterion) {
    let ctx = CallbackContext::new();
    ctx.set_default("echo", echo());
    ctx.push("echo", echo());
    let mut out = Vec::with_capacity(64);

    c.bench_function("invoke_override", |b| {
        b.iter(|| ctx.invoke(black_box("echo"), black_box(b"payload"), &mut out))
    });
}

fn benchmark_push_pop(c: &mut Criterion) {
    let ctx = CallbackContext::new();
    let handler = echo();

    c.bench_function("push_pop", |b| {
        b.iter(|| {
            ctx.push("echo", handler.clone());
            ctx.pop("echo");
        })
    });
}

fn benchmark_bridged_round_trip(c: &mut Criterion) {
    let (main_loop, dispatcher) = MainLoop::new();
    let ctx = CallbackContext::builder()
        .async_dispatcher(Arc::new(dispatcher))
        .build();
    ctx.set_default(
        "echo",
        CallbackHandler::new_async(|request| {
            let input = request.input().to_vec();
            request.respond_with(input);
        })
        .into_ref(),
    );
    let loop_thread = thread::spawn(move || main_loop.run());

    let mut out = Vec::with_capacity(64);
    c.bench_function("bridged_round_trip", |b| {
        b.iter(|| ctx.invoke(black_box("echo"), black_box(b"payload"), &mut out))
    });

    // Dropping the last dispatcher ends the loop.
    ctx.set_async_dispatcher(None);
    drop(ctx);
    let _ = loop_thread.join();
}

criterion_group!(
    benches,
    benchmark_invoke_default,
    benchmark_invoke_override,
    benchmark_push_pop,
    benchmark_bridged_round_trip
);
criterion_main!(benches);
