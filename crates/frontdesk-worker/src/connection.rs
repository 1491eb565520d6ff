use std::sync::Mutex;

use base64::Engine;
use qrcode::QrCode;
use qrcode::render::svg;
use tokio::sync::broadcast;

use crate::bus::EventBus;
use crate::events::{ConnectionStatus, DashboardEvent, StatusUpdate};

/// Owner of the process-wide connection status.
///
/// Every transition is published on the bus while the state lock is held,
/// so [`subscribe`](Self::subscribe) can hand out a snapshot and a receiver
/// with no transition slipping between the two.
pub struct ConnectionMonitor {
    state: Mutex<State>,
    bus: EventBus,
}

struct State {
    update: StatusUpdate,
    /// Raw challenge behind the rendered QR, while one is pending.
    challenge: Option<String>,
}

impl ConnectionMonitor {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: Mutex::new(State {
                update: StatusUpdate {
                    status: ConnectionStatus::Disconnected,
                    payload: None,
                },
                challenge: None,
            }),
            bus,
        }
    }

    /// The provider issued a login challenge.
    pub fn qr_received(&self, code: &str) {
        match render_qr_data_url(code) {
            Some(url) => {
                tracing::info!("QR code received");
                let mut state = self.lock();
                state.challenge = Some(code.to_string());
                self.publish(&mut state, ConnectionStatus::QrReady, Some(url));
            }
            None => {
                tracing::error!(len = code.len(), "Failed to render QR code");
                self.transition(
                    ConnectionStatus::Error,
                    Some("Error generating QR code".to_string()),
                );
            }
        }
    }

    pub fn authenticated(&self) {
        tracing::info!("Session authenticated");
        self.transition(ConnectionStatus::Connecting, None);
    }

    pub fn ready(&self) {
        tracing::info!("Session ready");
        self.transition(ConnectionStatus::Ready, None);
    }

    pub fn disconnected(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "Session disconnected");
        self.transition(ConnectionStatus::Disconnected, Some(reason));
    }

    pub fn failed(&self, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::error!(detail = %detail, "Connection error");
        self.transition(ConnectionStatus::Error, Some(detail));
    }

    pub fn snapshot(&self) -> StatusUpdate {
        self.lock().update.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().update.status
    }

    /// The raw login challenge, for renderers other than the dashboard.
    pub fn pending_challenge(&self) -> Option<String> {
        self.lock().challenge.clone()
    }

    /// Current status for the new observer, plus a receiver for every
    /// event published afterwards.
    pub fn subscribe(&self) -> (StatusUpdate, broadcast::Receiver<DashboardEvent>) {
        let state = self.lock();
        (state.update.clone(), self.bus.subscribe())
    }

    fn transition(&self, status: ConnectionStatus, payload: Option<String>) {
        let mut state = self.lock();
        state.challenge = None;
        self.publish(&mut state, status, payload);
    }

    fn publish(&self, state: &mut State, status: ConnectionStatus, payload: Option<String>) {
        state.update = StatusUpdate { status, payload };
        self.bus
            .publish(DashboardEvent::StatusUpdate(state.update.clone()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Renders the challenge as an SVG data URL the dashboard can show directly.
pub fn render_qr_data_url(code: &str) -> Option<String> {
    let qr = QrCode::new(code.as_bytes()).ok()?;
    let image = qr
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build();
    let encoded = base64::engine::general_purpose::STANDARD.encode(image.as_bytes());
    Some(format!("data:image/svg+xml;base64,{}", encoded))
}
