#![allow(dead_code)]

use nad_core::{ClientOptions, NadClient, Simulator};
use std::time::Duration;

pub async fn start_simulator() -> Simulator {
    Simulator::bind("127.0.0.1:0")
        .await
        .expect("simulator should bind an ephemeral port")
}

pub fn test_options() -> ClientOptions {
    ClientOptions {
        connect_timeout: Duration::from_millis(500),
        read_timeout: Duration::from_millis(500),
        ..ClientOptions::default()
    }
}

pub async fn connect(sim: &Simulator) -> NadClient {
    NadClient::connect(sim.endpoint(), test_options())
        .await
        .expect("client should connect to simulator")
}
