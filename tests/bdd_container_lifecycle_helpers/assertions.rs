//! Then-step assertions for container lifecycle scenarios.

use dockmgr::engine::ContainerSummary;
use rstest_bdd_macros::then;

use super::StepResult;
use super::state::{CommandResult, FailureKind, LifecycleState};
use crate::fake_engine::Lifecycle;

fn last_result(lifecycle_state: &LifecycleState) -> StepResult<CommandResult> {
    lifecycle_state
        .result
        .get()
        .ok_or_else(|| String::from("a command should have run"))
}

fn latest_listing(lifecycle_state: &LifecycleState) -> StepResult<Vec<ContainerSummary>> {
    lifecycle_state
        .listings
        .get()
        .and_then(|listings| listings.last().cloned())
        .ok_or_else(|| String::from("containers should have been listed"))
}

fn expect_failure(lifecycle_state: &LifecycleState, expected: FailureKind) -> StepResult<()> {
    match last_result(lifecycle_state)? {
        CommandResult::Failed { kind, .. } if kind == expected => Ok(()),
        CommandResult::Failed { kind, message } => Err(format!(
            "expected {expected:?} failure, got {kind:?}: {message}"
        )),
        CommandResult::Succeeded => Err(format!("expected {expected:?} failure, got success")),
    }
}

fn listing_has(listing: &[ContainerSummary], name: &str) -> bool {
    listing
        .iter()
        .any(|container| container.names.iter().any(|candidate| candidate == name))
}

#[then("the command succeeds")]
fn command_succeeds(lifecycle_state: &LifecycleState) -> StepResult<()> {
    match last_result(lifecycle_state)? {
        CommandResult::Succeeded => Ok(()),
        CommandResult::Failed { message, .. } => {
            Err(format!("expected success, got failure: {message}"))
        }
    }
}

#[then("the command fails with an invalid state error")]
fn command_fails_invalid_state(lifecycle_state: &LifecycleState) -> StepResult<()> {
    expect_failure(lifecycle_state, FailureKind::InvalidState)
}

#[then("the command fails with a not found error")]
fn command_fails_not_found(lifecycle_state: &LifecycleState) -> StepResult<()> {
    expect_failure(lifecycle_state, FailureKind::NotFound)
}

#[then("both listings are identical")]
fn listings_identical(lifecycle_state: &LifecycleState) -> StepResult<()> {
    let listings = lifecycle_state.listings.get().unwrap_or_default();
    match listings.as_slice() {
        [first, second] if first == second => Ok(()),
        [first, second] => Err(format!("listings differ: {first:?} vs {second:?}")),
        other => Err(format!("expected two listings, got {}", other.len())),
    }
}

#[then("the latest listing contains {name}")]
fn latest_listing_contains(lifecycle_state: &LifecycleState, name: String) -> StepResult<()> {
    let listing = latest_listing(lifecycle_state)?;
    if listing_has(&listing, &name) {
        return Ok(());
    }
    Err(format!("expected {name} in listing {listing:?}"))
}

#[then("the latest listing does not contain {name}")]
fn latest_listing_lacks(lifecycle_state: &LifecycleState, name: String) -> StepResult<()> {
    let listing = latest_listing(lifecycle_state)?;
    if listing_has(&listing, &name) {
        return Err(format!("did not expect {name} in listing {listing:?}"));
    }
    Ok(())
}

#[then("the latest listing has {count} containers")]
fn latest_listing_count(lifecycle_state: &LifecycleState, count: usize) -> StepResult<()> {
    let listing = latest_listing(lifecycle_state)?;
    if listing.len() == count {
        return Ok(());
    }
    Err(format!("expected {count} containers, got {}", listing.len()))
}

#[then("container {name} is still running")]
fn container_still_running(lifecycle_state: &LifecycleState, name: String) -> StepResult<()> {
    let engine = lifecycle_state
        .engine
        .get()
        .ok_or_else(|| String::from("engine should be initialised"))?;
    match engine.lifecycle_of(&name) {
        Some(Lifecycle::Running) => Ok(()),
        other => Err(format!("expected {name} to be running, found {other:?}")),
    }
}
