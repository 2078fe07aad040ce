mod common;

use std::time::Duration;

use common::{settings, start_simulator, statuses, Harness};
use nad_core::{Direction, Source};
use nad_tui::{DeviceOp, Severity, UiMessage};

#[tokio::test]
async fn held_volume_key_reaches_the_device_once() {
    let sim = start_simulator().await;
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(settings(Some(sim.endpoint()), 0, &dir));

    h.queue.push(DeviceOp::Connect(None));
    h.queue.push(DeviceOp::VolumeStep(Direction::Up));
    h.queue.push(DeviceOp::VolumeStep(Direction::Up));
    h.queue.push(DeviceOp::VolumeStep(Direction::Down));
    assert_eq!(
        h.queue.snapshot(),
        vec![DeviceOp::Connect(None), DeviceOp::VolumeStep(Direction::Down)]
    );

    let worker = h.start();
    let seen = h.collect_until(|m| statuses(m).len() == 2).await;
    let states = statuses(&seen);
    assert_eq!(states[0].volume, -30.0);
    assert_eq!(states[1].volume, -31.0);
    assert_eq!(sim.snapshot().await.volume, -31.0);

    h.cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn refresh_follows_every_device_op() {
    let sim = start_simulator().await;
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(settings(Some(sim.endpoint()), 0, &dir));

    h.queue.push(DeviceOp::Connect(None));
    h.queue.push(DeviceOp::VolumeSet(-20.0));
    h.queue.push(DeviceOp::SourceStep(Direction::Up));
    let worker = h.start();

    let seen = h.collect_until(|m| statuses(m).len() == 3).await;
    assert!(matches!(&seen[0], UiMessage::Connected { model, .. } if model == "NAD T 758 V3i"));
    let states = statuses(&seen);
    assert_eq!((states[0].volume, states[0].source), (-30.0, Source::Stream));
    assert_eq!((states[1].volume, states[1].source), (-20.0, Source::Stream));
    assert_eq!((states[2].volume, states[2].source), (-20.0, Source::Wireless));

    h.cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn lost_device_reports_disconnect_and_keeps_running() {
    let sim = start_simulator().await;
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(settings(Some(sim.endpoint()), 0, &dir));

    h.queue.push(DeviceOp::Connect(None));
    let worker = h.start();
    h.collect_until(|m| statuses(m).len() == 1).await;

    sim.shutdown();
    sim.stopped().await;
    h.queue.push(DeviceOp::MuteToggle);
    let seen = h
        .collect_until(|m| m.iter().any(|m| matches!(m, UiMessage::Disconnected(_))))
        .await;
    assert!(seen.iter().any(|m| matches!(
        m,
        UiMessage::Note { severity: Severity::Error, text } if text.contains("CommunicationFailed")
    )));

    // Still alive: the next op is answered with a not-connected note.
    h.queue.push(DeviceOp::PowerToggle);
    let seen = h.collect_until(|m| !m.is_empty()).await;
    assert!(matches!(
        &seen[0],
        UiMessage::Note { severity: Severity::Warning, text } if text.contains("not connected")
    ));

    h.cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn connect_without_address_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(settings(None, 0, &dir));
    h.queue.push(DeviceOp::Connect(None));
    let worker = h.start();

    let seen = h.collect_until(|m| !m.is_empty()).await;
    assert!(matches!(&seen[0], UiMessage::ConnectFailed(_)));

    h.cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn discovery_connects_to_the_first_receiver() {
    let sim = start_simulator().await;
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(settings(None, sim.local_addr().port(), &dir));

    h.queue.push(DeviceOp::Discover { refresh: true });
    let worker = h.start();

    let seen = h
        .collect_until(|m| m.iter().any(|m| matches!(m, UiMessage::Connected { .. })))
        .await;
    match &seen[0] {
        UiMessage::Discovered {
            devices,
            from_cache,
        } => {
            assert_eq!(devices.len(), 1);
            assert_eq!(devices[0].endpoint(), sim.endpoint());
            assert!(!from_cache);
        }
        other => panic!("expected discovery result, got {other:?}"),
    }
    assert!(dir.path().join("cache.json").exists());

    h.cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn cancellation_stops_an_idle_worker() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = Harness::new(settings(None, 0, &dir));
    let worker = h.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .expect("worker should stop promptly")
        .unwrap();
}
