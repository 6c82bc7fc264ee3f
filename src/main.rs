// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Zoom Remote desktop controller.
//!
//! Connects to the recorder, logs its status and sends key presses typed
//! on stdin.

use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zoom_remote::bluetooth::{RemoteKey, RfcommConnector};
use zoom_remote::config::Config;
use zoom_remote::events::LinkEvent;
use zoom_remote::keypad::Keypad;
use zoom_remote::link::{LinkHandle, LinkService, LinkState};
use zoom_remote::state::RemoteState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("zoom_remote=info".parse()?))
        .init();

    info!("Starting Zoom Remote v{}...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load()?;
    if let Some(address) = std::env::args().nth(1) {
        config.device.address = address;
    }
    if config.device.address.is_empty() {
        bail!(
            "No recorder address: pass one as an argument or set device.address in {}",
            Config::default_path().display()
        );
    }
    info!("Configuration loaded");

    let connector = RfcommConnector::new(config.device.channel).await?;
    let (link, mut events) = LinkService::spawn(Arc::new(connector), config.link.settings());
    let state = RemoteState::new();
    let keypad = Keypad::spawn(link.clone(), config.link.key_press());

    link.connect(config.device.address.clone())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    info!("Ready. Type a key name (record, play, mark, next, prev, rec-pause, vol+, vol-), status or quit.");

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                LinkEvent::StatusChanged(link_state) => {
                    state.record_status(link_state);
                    info!("Link {}", link_state.as_str());

                    if link_state == LinkState::Error {
                        if state.should_retry(config.link.max_connection_errors) {
                            schedule_reconnect(&link, &config);
                        } else {
                            error!(
                                "Device connection failed after {} attempts",
                                state.connection_errors()
                            );
                        }
                    }
                }
                LinkEvent::DataChanged(value) => {
                    let status = state.record_data(value);
                    info!("Recorder: {}", status);
                }
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !handle_line(line.trim(), &link, &keypad, &state, &config) {
                        break;
                    }
                }
                None => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    link.shutdown()?;
    link.closed().await;
    info!("Zoom Remote stopped");
    Ok(())
}

/// Handle one line of user input. Returns false to quit.
fn handle_line(
    line: &str,
    link: &LinkHandle,
    keypad: &Keypad,
    state: &RemoteState,
    config: &Config,
) -> bool {
    match line.to_lowercase().as_str() {
        "" => {}
        "quit" | "exit" => return false,
        "connect" => {
            state.reset_errors();
            let _ = link.connect(config.device.address.clone());
        }
        "disconnect" => {
            let _ = link.disconnect();
        }
        "status" => match state.get_recorder() {
            Some(status) => info!("Link {}, recorder {}", state.get_link_state().as_str(), status),
            None => info!("Link {}", state.get_link_state().as_str()),
        },
        other => match RemoteKey::parse(other) {
            Some(key) if state.is_synced() => keypad.press(key),
            Some(key) => warn!("Ignoring {}: recorder not synced", key.as_str()),
            None => warn!("Unknown command: {}", other),
        },
    }
    true
}

fn schedule_reconnect(link: &LinkHandle, config: &Config) {
    let link = link.clone();
    let address = config.device.address.clone();
    let delay = config.link.reconnect_delay();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        info!("Reconnecting to {}", address);
        let _ = link.connect(address);
    });
}
