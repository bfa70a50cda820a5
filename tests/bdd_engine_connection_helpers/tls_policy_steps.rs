//! TLS policy step definitions for BDD tests.
//!
//! These steps validate remote endpoint addresses against the TLS settings
//! without contacting a daemon.

use camino::Utf8PathBuf;
use dockmgr::engine::EndpointConfig;
use rstest_bdd_macros::{given, then, when};

use super::{EndpointOutcome, EngineConnectionState, StepResult};

fn update_tls(
    state: &EngineConnectionState,
    change: impl FnOnce(&mut dockmgr::config::TlsConfig),
) -> StepResult<()> {
    let mut tls = state.tls.get().ok_or("tls settings should be initialised")?;
    change(&mut tls);
    state.tls.set(tls);
    Ok(())
}

fn endpoint_outcome(state: &EngineConnectionState) -> StepResult<EndpointOutcome> {
    state
        .endpoint_outcome
        .get()
        .ok_or("endpoint should have been validated")
}

// =============================================================================
// Given step definitions
// =============================================================================

#[given("TLS verification is disabled")]
fn tls_verification_disabled(engine_connection_state: &EngineConnectionState) -> StepResult<()> {
    update_tls(engine_connection_state, |tls| tls.verify = false)
}

#[given("{host} is a trusted host")]
fn host_is_trusted(engine_connection_state: &EngineConnectionState, host: String) -> StepResult<()> {
    update_tls(engine_connection_state, |tls| tls.trusted_hosts.push(host))
}

#[given("the certificate directory is {path}")]
fn certificate_directory_is(
    engine_connection_state: &EngineConnectionState,
    path: String,
) -> StepResult<()> {
    update_tls(engine_connection_state, |tls| {
        tls.cert_path = Some(Utf8PathBuf::from(path));
    })
}

// =============================================================================
// When step definitions
// =============================================================================

#[when("endpoint {address} is validated")]
fn endpoint_is_validated(
    engine_connection_state: &EngineConnectionState,
    address: String,
) -> StepResult<()> {
    let tls = engine_connection_state
        .tls
        .get()
        .ok_or("tls settings should be initialised")?;
    let outcome = match EndpointConfig::new(&address, &tls) {
        Ok(endpoint) => EndpointOutcome::Accepted {
            address: String::from(endpoint.address()),
            tls_verify: endpoint.tls_verify(),
        },
        Err(error) => EndpointOutcome::Rejected(error.to_string()),
    };
    engine_connection_state.endpoint_outcome.set(outcome);
    Ok(())
}

// =============================================================================
// Then step definitions
// =============================================================================

#[then("the endpoint is accepted as {expected}")]
fn endpoint_accepted_as(
    engine_connection_state: &EngineConnectionState,
    expected: String,
) -> StepResult<()> {
    match endpoint_outcome(engine_connection_state)? {
        EndpointOutcome::Accepted { address, .. } => {
            assert_eq!(address, expected, "unexpected normalised address");
            Ok(())
        }
        EndpointOutcome::Rejected(_) => Err("expected the endpoint to be accepted"),
    }
}

#[then("certificate verification is enabled")]
fn verification_enabled(engine_connection_state: &EngineConnectionState) -> StepResult<()> {
    match endpoint_outcome(engine_connection_state)? {
        EndpointOutcome::Accepted {
            tls_verify: true, ..
        } => Ok(()),
        EndpointOutcome::Accepted { .. } => Err("expected certificate verification"),
        EndpointOutcome::Rejected(_) => Err("expected the endpoint to be accepted"),
    }
}

#[then("certificate verification is disabled")]
fn verification_disabled(engine_connection_state: &EngineConnectionState) -> StepResult<()> {
    match endpoint_outcome(engine_connection_state)? {
        EndpointOutcome::Accepted {
            tls_verify: false, ..
        } => Ok(()),
        EndpointOutcome::Accepted { .. } => Err("expected plaintext transport"),
        EndpointOutcome::Rejected(_) => Err("expected the endpoint to be accepted"),
    }
}

#[then("the endpoint is rejected mentioning {keyword}")]
fn endpoint_rejected_mentioning(
    engine_connection_state: &EngineConnectionState,
    keyword: String,
) -> StepResult<()> {
    match endpoint_outcome(engine_connection_state)? {
        EndpointOutcome::Rejected(message) => {
            assert!(
                message.contains(&keyword),
                "expected rejection to mention '{keyword}', got: {message}"
            );
            Ok(())
        }
        EndpointOutcome::Accepted { .. } => Err("expected the endpoint to be rejected"),
    }
}
