mod common;

use common::{connect, start_simulator};
use nad_core::{ConnState, Direction, NadError, Power, Source};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::test]
async fn power_toggle_turns_on_then_off() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    assert_eq!(client.power().await.unwrap(), Power::Off);
    assert_eq!(client.power_toggle().await.unwrap(), Power::On);
    assert_eq!(client.power_toggle().await.unwrap(), Power::Off);
    assert_eq!(sim.snapshot().await.power, Power::Off);

    // The power change ends with a fresh session that still works.
    assert_eq!(client.state(), ConnState::Ready);
    assert_eq!(client.model().await.unwrap(), "NAD T 758 V3i");
}

#[tokio::test]
async fn raw_power_step_answers_on_the_wire() {
    let sim = start_simulator().await;
    let stream = TcpStream::connect(sim.local_addr()).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    write_half.write_all(b"Main.Power+\r\n").await.unwrap();
    assert_eq!(lines.next_line().await.unwrap().unwrap(), "Main.Power=On");

    // Garbage is ignored without a response; the next valid token still answers.
    write_half
        .write_all(b"hello\0Main.Bass=3\nMain.Power+\n")
        .await
        .unwrap();
    assert_eq!(lines.next_line().await.unwrap().unwrap(), "Main.Power=Off");
}

#[tokio::test]
async fn unterminated_flood_does_not_wedge_the_session() {
    let sim = start_simulator().await;
    let stream = TcpStream::connect(sim.local_addr()).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    write_half.write_all(&[b'x'; 16 * 1024]).await.unwrap();
    write_half.write_all(b"\nMain.Power?\n").await.unwrap();
    assert_eq!(lines.next_line().await.unwrap().unwrap(), "Main.Power=Off");
}

#[tokio::test]
async fn volume_set_then_query() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    assert_eq!(client.set_volume(-25.0).await.unwrap(), -25.0);
    assert_eq!(client.volume().await.unwrap(), -25.0);

    for v in [-80.0, -42.5, -0.3, 0.0, 7.1, 10.0] {
        client.set_volume(v).await.unwrap();
        let got = client.volume().await.unwrap();
        assert!((got - v).abs() < 0.05, "set {v}, got {got}");
    }
}

#[tokio::test]
async fn volume_is_clamped_to_limits() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    client.set_volume(50.0).await.unwrap();
    assert_eq!(client.volume().await.unwrap(), 10.0);
    client.set_volume(-200.0).await.unwrap();
    assert_eq!(client.volume().await.unwrap(), -80.0);
}

#[tokio::test]
async fn volume_step_is_query_then_set() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    assert_eq!(client.step_volume(Direction::Up).await.unwrap(), -29.0);
    assert_eq!(client.step_volume(Direction::Down).await.unwrap(), -30.0);
    assert_eq!(sim.snapshot().await.volume, -30.0);
}

#[tokio::test]
async fn eight_source_steps_wrap_around() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    assert_eq!(client.source().await.unwrap(), Source::Stream);
    let mut last = Source::Stream;
    for _ in 0..Source::ALL.len() {
        last = client.step_source(Direction::Up).await.unwrap();
    }
    assert_eq!(last, Source::Stream);

    for _ in 0..Source::ALL.len() {
        last = client.step_source(Direction::Down).await.unwrap();
    }
    assert_eq!(last, Source::Stream);
}

#[tokio::test]
async fn source_names_match_any_case() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    assert_eq!(client.set_source_name("phono").await.unwrap(), Source::Phono);
    assert_eq!(client.source().await.unwrap(), Source::Phono);
    assert!(matches!(
        client.set_source_name("hdmi").await,
        Err(NadError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn brightness_wraps_at_both_ends() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    client.set_brightness(3).await.unwrap();
    assert_eq!(client.step_brightness(Direction::Up).await.unwrap(), 0);
    assert_eq!(client.step_brightness(Direction::Down).await.unwrap(), 3);

    for n in 0..=3 {
        client.set_brightness(n).await.unwrap();
        assert_eq!(client.brightness().await.unwrap() as i64, n);
    }
}

#[tokio::test]
async fn refresh_reads_factory_defaults() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    let state = client.refresh().await.unwrap();
    assert_eq!(state, nad_core::simulator::initial_state());
}

#[tokio::test]
async fn mute_toggle_round_trips() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;

    assert_eq!(client.toggle_mute().await.unwrap(), nad_core::Mute::On);
    assert_eq!(client.toggle_mute().await.unwrap(), nad_core::Mute::Off);
}

#[tokio::test]
async fn lost_device_is_communication_failure_after_one_retry() {
    let sim = start_simulator().await;
    let mut client = connect(&sim).await;
    client.volume().await.unwrap();

    sim.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = client.volume().await.unwrap_err();
    assert_eq!(err.tag(), "CommunicationFailed", "{err}");
    assert_eq!(client.state(), ConnState::Idle);
}

#[tokio::test]
async fn two_clients_share_one_device_state() {
    let sim = start_simulator().await;
    let mut a = connect(&sim).await;
    let mut b = connect(&sim).await;

    a.set_source(Source::Opt1).await.unwrap();
    assert_eq!(b.source().await.unwrap(), Source::Opt1);
}
