//! Elevation controller behaviour against scripted launchers.

use super::harness::{HelperFixture, Script, ScriptedEngine};
use crate::ElevationPhase;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fixture(script: Script) -> HelperFixture {
    HelperFixture::new(ScriptedEngine::valid(), script)
}

#[tokio::test]
async fn test_normal_exit_code_is_returned() {
    let fixture = fixture(Script::Exit(7));
    let code = fixture
        .elevation(Duration::from_secs(5))
        .trigger_formal_assessment()
        .await;
    assert_eq!(code, 7);
}

#[tokio::test]
async fn test_declined_launch_returns_one() {
    let fixture = fixture(Script::DeclineAtLaunch);
    let code = fixture
        .elevation(Duration::from_secs(5))
        .trigger_formal_assessment()
        .await;
    assert_eq!(code, 1);
}

#[tokio::test]
async fn test_declined_prompt_after_start_returns_one() {
    let fixture = fixture(Script::DeclineAtWait);
    let code = fixture
        .elevation(Duration::from_secs(5))
        .trigger_formal_assessment()
        .await;
    assert_eq!(code, 1);
}

#[tokio::test]
async fn test_launch_failure_returns_default_zero() {
    let fixture = fixture(Script::Fail);
    let code = fixture
        .elevation(Duration::from_secs(5))
        .trigger_formal_assessment()
        .await;
    assert_eq!(code, 0);
    assert_eq!(fixture.launcher.launches(), 1);
}

#[tokio::test]
async fn test_hang_is_bounded() {
    let fixture = fixture(Script::Hang(None));
    let started = Instant::now();

    let code = fixture
        .elevation(Duration::from_millis(100))
        .trigger_formal_assessment()
        .await;

    assert_eq!(code, 0);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_timeout_uses_status_readable_at_that_moment() {
    let fixture = fixture(Script::Hang(Some(3)));
    let code = fixture
        .elevation(Duration::from_millis(50))
        .trigger_formal_assessment()
        .await;
    assert_eq!(code, 3);
}

#[tokio::test]
async fn test_phases_for_consented_run() {
    let fixture = fixture(Script::Exit(0));
    let phases = Arc::new(Mutex::new(Vec::new()));
    let seen = phases.clone();
    let controller = fixture
        .elevation(Duration::from_secs(5))
        .with_phase_observer(move |phase| seen.lock().push(phase));

    controller.trigger_formal_assessment().await;

    assert_eq!(
        *phases.lock(),
        vec![
            ElevationPhase::Launching,
            ElevationPhase::Consented,
            ElevationPhase::Running,
            ElevationPhase::Exited,
            ElevationPhase::Idle,
        ]
    );
}

#[tokio::test]
async fn test_phases_for_declined_run() {
    let fixture = fixture(Script::DeclineAtLaunch);
    let phases = Arc::new(Mutex::new(Vec::new()));
    let seen = phases.clone();
    let controller = fixture
        .elevation(Duration::from_secs(5))
        .with_phase_observer(move |phase| seen.lock().push(phase));

    controller.trigger_formal_assessment().await;

    assert_eq!(
        *phases.lock(),
        vec![
            ElevationPhase::Launching,
            ElevationPhase::Declined,
            ElevationPhase::Failed,
            ElevationPhase::Idle,
        ]
    );
    assert_eq!(controller.phase(), ElevationPhase::Idle);
}

#[tokio::test]
async fn test_controller_never_pushes() {
    let fixture = fixture(Script::Exit(0));
    fixture
        .elevation(Duration::from_secs(5))
        .trigger_formal_assessment()
        .await;
    assert_eq!(fixture.sink.count(), 0);
}
