mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use callback_core::{CallbackConfig, CallbackContext, CallbackError, CallbackHandler, MainLoop};
use common::ThreadForwarder;

fn echo_async() -> callback_core::HandlerRef {
    CallbackHandler::new_async(|mut request| {
        let input = request.input().to_vec();
        request.output_mut().clear();
        request.output_mut().extend_from_slice(&input);
        request.respond();
    })
    .into_ref()
}

#[test]
fn test_invoke_blocks_until_forwarded_reply() {
    let delay = Duration::from_millis(50);
    let ctx = CallbackContext::builder()
        .async_dispatcher(ThreadForwarder::new(delay))
        .build();
    ctx.set_default_async("echo", echo_async());
    ctx.set_in_async_job(true);

    let started = Instant::now();
    let mut out = Vec::new();
    assert!(ctx.invoke("echo", b"payload", &mut out));

    assert!(started.elapsed() >= delay);
    assert_eq!(out, b"payload");
    ctx.set_in_async_job(false);
}

#[test]
fn test_fifty_concurrent_callers_get_their_own_replies() {
    let ctx = CallbackContext::builder()
        .async_dispatcher(ThreadForwarder::new(Duration::from_millis(10)))
        .build();
    ctx.set_default_async("echo", echo_async());

    let callers: Vec<_> = (0..50u32)
        .map(|i| {
            let ctx = ctx.clone();
            thread::spawn(move || {
                ctx.set_in_async_job(true);
                let input = format!("caller-{i}").into_bytes();
                let mut out = Vec::new();
                assert!(ctx.invoke("echo", &input, &mut out));
                (input, out)
            })
        })
        .collect();

    for caller in callers {
        let (input, out) = caller.join().unwrap();
        assert_eq!(out, input);
    }
}

#[test]
fn test_main_loop_runs_handlers_on_its_own_thread() {
    let (main_loop, dispatcher) = MainLoop::new();
    let ctx = CallbackContext::builder()
        .async_dispatcher(Arc::new(dispatcher))
        .build();

    let loop_thread = thread::current().id();
    ctx.set_default_async(
        "where",
        CallbackHandler::new_async(move |request| {
            let on_loop = thread::current().id() == loop_thread;
            request.respond_with(vec![u8::from(on_loop)]);
        })
        .into_ref(),
    );

    let worker = {
        let ctx = ctx.clone();
        thread::spawn(move || {
            ctx.set_in_async_job(true);
            ctx.call("where", b"").unwrap()
        })
    };

    // Serve until the worker's request has been handled.
    while !worker.is_finished() {
        main_loop.run_once(Duration::from_millis(10));
    }
    assert_eq!(worker.join().unwrap(), vec![1]);
}

#[test]
fn test_configured_timeout_leaves_output_untouched() {
    let mut config = CallbackConfig::default();
    config.async_bridge.response_timeout_ms = Some(20);
    let ctx = CallbackContext::builder()
        .config(config)
        .async_dispatcher(ThreadForwarder::new(Duration::from_millis(500)))
        .build();
    ctx.set_default_async("slow", echo_async());
    ctx.set_in_async_job(true);

    let mut out = b"sentinel".to_vec();
    let err = ctx.try_invoke("slow", b"late", &mut out).unwrap_err();
    assert!(matches!(err, CallbackError::ResponseTimeout { .. }));
    assert_eq!(out, b"sentinel");

    // `invoke` still reports that a handler was found.
    assert!(ctx.invoke("slow", b"late", &mut out));
    assert_eq!(out, b"sentinel");
    ctx.set_in_async_job(false);
}

#[test]
fn test_closed_main_loop_abandons_request() {
    let (main_loop, dispatcher) = MainLoop::new();
    drop(main_loop);
    let ctx = CallbackContext::builder()
        .async_dispatcher(Arc::new(dispatcher))
        .build();
    ctx.set_default("echo", echo_async());

    let mut out = b"sentinel".to_vec();
    let err = ctx.try_invoke("echo", b"x", &mut out).unwrap_err();
    assert!(matches!(err, CallbackError::ResponseAbandoned { .. }));
    assert_eq!(out, b"sentinel");
}
