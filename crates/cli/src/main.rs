//! `remote-action` CLI entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse arguments**: method name, JSON parameters, and call
//!    configuration overrides.
//! 2. **Wire observability**: configure `tracing-subscriber` with an
//!    `EnvFilter` (`RUST_LOG`) and a compact or JSON formatter on stderr.
//!    All spans and events emitted by the library crates flow through it.
//! 3. **Construct infrastructure**: build a host environment around a
//!    [`loopback::LoopbackManager`] (or no remoting at all with `--no-host`)
//!    and probe it.
//! 4. **Run one call**: invoke the remote action, optionally cancel it after
//!    a delay, and print the [`invocation::Completion`] as one JSON line on
//!    stdout.
//!
//! Every completion, including transport errors and cancellation, exits 0.
//! Only malformed input (bad method name, parameters, configuration, or
//! fixture) exits non-zero.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use invocation::{call, Completion};
use loopback::{echo_fixture, LoopbackManager, Script};
use remoting::{probe, CallConfiguration, CallParameters, CallRequest, HostEnvironment};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "remote-action")]
#[command(about = "Invoke one remote action through a scripted loopback transport")]
struct Args {
    /// Fully-qualified method name, e.g. `MyController.myMethod`
    #[arg(long)]
    method: String,

    /// Parameters as JSON (array for positional, object for keyed)
    #[arg(long, default_value = "[]")]
    params: String,

    /// JSON loopback script; defaults to the built-in echo fixture
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Run without a remoting capability in the host environment
    #[arg(long)]
    no_host: bool,

    /// Ask the transport not to HTML-escape string results
    #[arg(long)]
    no_escape: bool,

    /// Ask the transport not to buffer the call
    #[arg(long)]
    no_buffer: bool,

    /// Transport timeout in milliseconds (1..=120000)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Cancel the call after this many milliseconds
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn build_request(args: &Args) -> Result<CallRequest> {
    let parameters: serde_json::Value =
        serde_json::from_str(&args.params).context("--params is not valid JSON")?;

    let mut configuration = CallConfiguration::default()
        .with_escape(!args.no_escape)
        .with_buffer(!args.no_buffer);
    if let Some(ms) = args.timeout_ms {
        configuration = configuration.with_timeout(Duration::from_millis(ms))?;
    }

    Ok(CallRequest::parse(&args.method, CallParameters::from_value(parameters))?
        .with_configuration(configuration))
}

fn build_host(args: &Args) -> Result<HostEnvironment> {
    if args.no_host {
        return Ok(HostEnvironment::empty());
    }

    let script = match &args.fixture {
        Some(path) => Script::load(path)
            .with_context(|| format!("loading fixture {}", path.display()))?,
        None => echo_fixture(),
    };
    Ok(HostEnvironment::with_manager(Arc::new(LoopbackManager::new(script))))
}

async fn run(args: &Args) -> Result<Completion> {
    let request = build_request(args)?;
    let capability = probe(&build_host(args)?);
    info!(method = %request.method(), present = capability.is_present(), "invoking remote action");

    let pending = call(&capability, request);
    if let Some(ms) = args.cancel_after_ms {
        let cancellation = pending.cancellation_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            let status = cancellation.cancel();
            info!(?status, "cancellation requested");
        });
    }

    Ok(pending.await)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let completion = run(&args).await?;
    println!("{}", serde_json::to_string(&completion)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use remoting::{CallOutcome, RemotingError};
    use serde_json::json;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["remote-action"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn request_carries_parameters_and_overrides() {
        let request = build_request(&args(&[
            "--method",
            "MyController.myControllerFunctionName",
            "--params",
            r#"{"x":1}"#,
            "--no-escape",
            "--timeout-ms",
            "5000",
        ]))
        .unwrap();

        assert_eq!(request.parameters().to_value(), json!({"x": 1}));
        assert!(!request.configuration().escape());
        assert!(request.configuration().buffer());
        assert_eq!(request.configuration().timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn malformed_inputs_are_errors() {
        let bad_method = build_request(&args(&["--method", "nodot"])).unwrap_err();
        assert!(matches!(
            bad_method.downcast_ref::<RemotingError>(),
            Some(RemotingError::InvalidMethodName { .. })
        ));

        assert!(build_request(&args(&["--method", "A.b", "--params", "{"])).is_err());
        assert!(build_request(&args(&["--method", "A.b", "--timeout-ms", "0"])).is_err());
    }

    #[tokio::test]
    async fn runs_against_echo_fixture() {
        let completion = run(&args(&[
            "--method",
            "MyController.myControllerFunctionName",
            "--params",
            r#"{"x":1}"#,
        ]))
        .await
        .unwrap();

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
    async fn no_host_yields_unavailable() {
        let completion = run(&args(&["--method", "A.b", "--no-host"])).await.unwrap();
        assert_eq!(completion, Completion::Outcome(CallOutcome::unavailable()));
    }

    #[test]
    fn completion_prints_as_tagged_json() {
        let line = serde_json::to_value(Completion::Outcome(CallOutcome::unavailable())).unwrap();
        assert_eq!(
            line,
            json!({
                "completion": "outcome",
                "outcome": "transport_error",
                "message": "Could not find Visualforce Remote Object"
            })
        );
        assert_eq!(
            serde_json::to_value(Completion::Cancelled).unwrap(),
            json!({"completion": "cancelled"})
        );
    }
}
