mod common;

use std::thread;
use std::time::Duration;

use callback_core::constants::callbacks;
use callback_core::standard::{
    self, AdditionalHeaders, AdditionalHeadersIn, AdditionalHeadersOut, FullAuthentication,
    FullAuthenticationFlags, FullAuthenticationIn, FullAuthenticationOut, HttpProxyAuthentication,
    Question, QuestionIn, QuestionOut,
};
use callback_core::{CallbackContext, JobRunner, MainLoop, StandardCallback};

#[test]
fn test_channel_names_match_constants() {
    assert_eq!(FullAuthentication::NAME, callbacks::FULL_AUTHENTICATION);
    assert_eq!(Question::NAME, callbacks::QUESTION);
    assert_eq!(HttpProxyAuthentication::NAME, "http:proxy-authentication");
}

#[test]
fn test_authentication_prompt_through_main_loop() {
    let (main_loop, dispatcher) = MainLoop::new();
    let ctx = CallbackContext::builder()
        .async_dispatcher(std::sync::Arc::new(dispatcher))
        .build();

    ctx.set_default_async(
        FullAuthentication::NAME,
        standard::typed_async_handler::<FullAuthentication, _>(|request, mut reply, responder| {
            if request.flags.need_password {
                reply.username = request.default_user.clone();
                reply.password = Some("hunter2".into());
            } else {
                reply.abort_auth = true;
            }
            responder.respond(reply);
        })
        .into_ref(),
    );

    let runner = JobRunner::new(ctx.clone());
    let job = runner
        .spawn(|ctx| {
            let request = FullAuthenticationIn {
                flags: FullAuthenticationFlags {
                    need_password: true,
                    need_username: true,
                    ..Default::default()
                },
                uri: "smb://server/share".into(),
                default_user: Some("guest".into()),
                ..Default::default()
            };
            let mut reply = FullAuthenticationOut::default();
            let found = standard::invoke_typed::<FullAuthentication>(ctx, &request, &mut reply).unwrap();
            (found, reply)
        })
        .unwrap();

    while !job.is_finished() {
        main_loop.run_once(Duration::from_millis(10));
    }
    let (found, reply) = job.join().unwrap();

    assert!(found);
    assert!(!reply.abort_auth);
    assert_eq!(reply.username.as_deref(), Some("guest"));
    assert_eq!(reply.password.as_deref(), Some("hunter2"));
}

#[test]
fn test_question_override_on_one_thread() {
    let ctx = CallbackContext::new();
    ctx.set_default(
        Question::NAME,
        standard::typed_handler::<Question, _>(|_, reply| reply.answer = -1).into_ref(),
    );

    let worker_ctx = ctx.clone();
    let worker = thread::spawn(move || {
        let _guard = worker_ctx.push_scoped(
            Question::NAME,
            standard::typed_handler::<Question, _>(|question, reply| {
                reply.answer = question
                    .choices
                    .iter()
                    .position(|choice| choice == "Skip")
                    .map_or(-1, |i| i as i32);
            })
            .into_ref(),
        );
        let question = QuestionIn {
            primary_message: "File exists".into(),
            secondary_message: None,
            choices: vec!["Replace".into(), "Skip".into()],
        };
        let mut reply = QuestionOut::default();
        standard::invoke_typed::<Question>(&worker_ctx, &question, &mut reply).unwrap();
        reply.answer
    });

    assert_eq!(worker.join().unwrap(), 1);

    let mut reply = QuestionOut::default();
    assert!(standard::invoke_typed::<Question>(&ctx, &QuestionIn::default(), &mut reply).unwrap());
    assert_eq!(reply.answer, -1);
}

#[test]
fn test_additional_headers_are_collected() {
    let ctx = CallbackContext::new();
    ctx.set_default(
        AdditionalHeaders::NAME,
        standard::typed_handler::<AdditionalHeaders, _>(|request, reply| {
            reply.headers.push(format!("X-Origin: {}", request.uri));
        })
        .into_ref(),
    );

    let mut reply = AdditionalHeadersOut {
        headers: vec!["Accept: */*".into()],
    };
    let request = AdditionalHeadersIn {
        uri: "http://example.org/".into(),
    };
    assert!(standard::invoke_typed::<AdditionalHeaders>(&ctx, &request, &mut reply).unwrap());
    assert_eq!(
        reply.headers,
        vec!["Accept: */*".to_string(), "X-Origin: http://example.org/".to_string()]
    );
}
