//! End-to-end behavior of the invocation effect over the loopback transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use invocation::{call, invoke, CancelStatus, Completion};
use loopback::{echo_fixture, LoopbackManager, Script, ScriptedReply};
use remoting::{
    probe, CallConfiguration, CallOutcome, CallRequest, CapabilityHandle, HostEnvironment,
    RemotingRoot, ResponseEvent,
};
use serde_json::json;

fn capability(manager: &LoopbackManager) -> CapabilityHandle {
    probe(&HostEnvironment::with_manager(Arc::new(manager.clone())))
}

fn request(method: &str) -> CallRequest {
    CallRequest::parse(method, json!({"x": 1})).unwrap()
}

#[tokio::test]
async fn known_method_echoes_parameters() {
    let manager = LoopbackManager::new(echo_fixture());

    let completion = call(
        &capability(&manager),
        request("MyController.myControllerFunctionName"),
    )
    .await;

    assert_eq!(
        completion,
        Completion::Outcome(CallOutcome::Success {
            result: json!({
                "controller": "MyController.myControllerFunctionName",
                "result": {"x": 1}
            })
        })
    );
}

#[tokio::test]
async fn unknown_method_is_application_exception() {
    let manager = LoopbackManager::new(echo_fixture());

    let completion = call(&capability(&manager), request("Unknown.method")).await;

    assert_eq!(
        completion,
        Completion::Outcome(CallOutcome::ApplicationException {
            message: "Apex Controller Wrong".to_owned(),
            location: "No Apex Controller".to_owned(),
        })
    );
}

#[test]
fn absent_capability_resolves_synchronously_without_transport() {
    // A partially wired host: root present, namespace missing.
    let env = HostEnvironment::empty().with_root(RemotingRoot::default());
    let capability = probe(&env);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    invoke(
        &capability,
        request("MyController.myControllerFunctionName"),
        move |completion| sink.lock().unwrap().push(completion),
    );

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Completion::Outcome(CallOutcome::transport_error(
            "Could not find Visualforce Remote Object"
        ))]
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_before_delayed_response_takes_cancellation_path() {
    let manager = LoopbackManager::new(echo_fixture().with_delay(Duration::from_millis(500)));

    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let handle = invoke(
        &capability(&manager),
        request("MyController.myControllerFunctionName"),
        move |completion| sink.lock().unwrap().push(completion),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.cancel(), CancelStatus::Cancelled);
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    assert_eq!(manager.cancellation_count(), 1);
    assert_eq!(*outcomes.lock().unwrap(), vec![Completion::Cancelled]);
}

#[tokio::test(start_paused = true)]
async fn pending_call_resolves_cancelled_when_cancelled_from_another_task() {
    let manager = LoopbackManager::new(echo_fixture().with_delay(Duration::from_millis(500)));
    let pending = call(&capability(&manager), request("Unknown.method"));
    let cancellation = pending.cancellation_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        cancellation.cancel()
    });

    assert_eq!(pending.await, Completion::Cancelled);
    assert_eq!(canceller.await.unwrap(), CancelStatus::Cancelled);
    assert_eq!(manager.cancellation_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_after_response_is_a_noop() {
    let manager = LoopbackManager::new(echo_fixture().with_delay(Duration::from_millis(50)));
    let pending = call(
        &capability(&manager),
        request("MyController.myControllerFunctionName"),
    );
    let cancellation = pending.cancellation_handle();

    let completion = pending.await;
    assert!(completion.outcome().is_some_and(CallOutcome::is_success));

    assert_eq!(cancellation.cancel(), CancelStatus::AlreadySettled);
    assert_eq!(cancellation.cancel(), CancelStatus::AlreadySettled);
    assert_eq!(manager.cancellation_count(), 0);
}

#[tokio::test]
async fn transport_fault_is_reported_as_transport_error() {
    let manager = LoopbackManager::failing("Remoting manager is not initialised");

    let completion = call(&capability(&manager), request("A.b")).await;

    assert_eq!(
        completion.into_outcome(),
        Some(CallOutcome::transport_error("Remoting manager is not initialised"))
    );
    assert_eq!(manager.invocation_count(), 1);
}

#[tokio::test]
async fn non_exception_failure_is_transport_error() {
    let script = Script::default().with_reply(
        "Orders.submit",
        ScriptedReply::fixed(
            json!(null),
            ResponseEvent::failure("rpc", "Unable to connect to the server"),
        ),
    );
    let manager = LoopbackManager::new(script);

    let completion = call(&capability(&manager), request("Orders.submit")).await;

    assert_eq!(
        completion,
        Completion::Outcome(CallOutcome::transport_error("Unable to connect to the server"))
    );
}

#[tokio::test(start_paused = true)]
async fn transport_timeout_is_a_transport_error_not_a_fault() {
    let manager = LoopbackManager::new(echo_fixture().with_delay(Duration::from_millis(10_000)));
    let config = CallConfiguration::default()
        .with_timeout(Duration::from_millis(2_000))
        .unwrap();

    let completion = call(
        &capability(&manager),
        request("MyController.myControllerFunctionName").with_configuration(config),
    )
    .await;

    assert_eq!(
        completion,
        Completion::Outcome(CallOutcome::transport_error(
            "Remoting request exceeded timeout of 2000 ms"
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_settle_independently() {
    let manager = LoopbackManager::new(echo_fixture().with_delay(Duration::from_millis(100)));
    let capability = capability(&manager);

    let first = call(&capability, request("MyController.myControllerFunctionName"));
    let second = call(&capability, request("Unknown.method"));
    let third = call(&capability, request("MyController.myControllerFunctionName"));
    assert_eq!(third.cancel(), CancelStatus::Cancelled);

    let (first, second, third) = tokio::join!(first, second, third);

    assert!(first.outcome().is_some_and(CallOutcome::is_success));
    assert!(matches!(
        second.outcome(),
        Some(CallOutcome::ApplicationException { .. })
    ));
    assert!(third.is_cancelled());
    assert_eq!(manager.invocation_count(), 3);
    assert_eq!(manager.cancellation_count(), 1);
}
