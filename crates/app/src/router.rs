//! Translation engine: classify one inbound message by topic and translate
//! it to the other domain.
//!
//! `handle` never fails. Every problem with a message is logged and the
//! message is dropped; the returned [`Dispatch`] summarises what happened.

use std::sync::Arc;

use dynabridge_domain::climate::{
    AreaState, ClimatePayload, FanMode, HvacMode, StateField, status_is_ok,
};
use dynabridge_domain::dynet::{self, BodyAddress, DynetBody, channel};
use dynabridge_domain::error::{BridgeError, EncodeError};
use dynabridge_domain::frame::{BusCommand, BusFrame, Classified, FrameType};
use dynabridge_domain::id::{AreaId, CorrelationId};
use serde::{Deserialize, Serialize};

use crate::correlation::{CorrelationTracker, Resolution};
use crate::gate::{DependencyGate, Liveness, Upstream};
use crate::ports::MessagePublisher;
use crate::state_cache::StateCache;
use crate::topics::{ClimateTarget, Inbound, TopicLayout};

/// Channel-level commands are sent without a fade.
const NO_FADE: u32 = 0;

/// Addressing of commands the bridge originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Join written into every outgoing body. Frames echoing it back are
    /// recognized as the bridge's own.
    pub out_join: u8,
    pub address: BodyAddress,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            out_join: 0xFE,
            address: BodyAddress::hvac(),
        }
    }
}

/// What `handle` did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// An availability announcement updated the gate.
    Liveness(Upstream, Liveness),
    /// Dropped because these adapters are offline.
    Gated(Vec<Upstream>),
    /// Number of messages successfully published in response.
    Published(usize),
    Resolved(Resolution),
    /// Valid, but nothing to do.
    Ignored(&'static str),
    /// Dropped with an error; the reason has been logged.
    Failed(String),
}

/// Body of a `<bus>/set` publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSetMessage {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub hex_string: String,
    pub response_id: CorrelationId,
}

#[derive(Debug, Deserialize)]
struct BusResponse {
    status: String,
}

/// One bus command derived from a changed field.
struct PlannedCommand {
    comment: String,
    body: Result<DynetBody, EncodeError>,
}

pub struct Router<P> {
    publisher: P,
    topics: TopicLayout,
    settings: BridgeSettings,
    cache: StateCache,
    tracker: Arc<CorrelationTracker>,
    gate: DependencyGate,
}

impl<P: MessagePublisher> Router<P> {
    /// Create a router with the gate closed.
    pub fn new(
        publisher: P,
        topics: TopicLayout,
        settings: BridgeSettings,
        cache: StateCache,
        tracker: Arc<CorrelationTracker>,
    ) -> Self {
        Self {
            publisher,
            topics,
            settings,
            cache,
            tracker,
            gate: DependencyGate::new(),
        }
    }

    pub fn topics(&self) -> &TopicLayout {
        &self.topics
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn tracker(&self) -> &Arc<CorrelationTracker> {
        &self.tracker
    }

    pub fn gate(&self) -> &DependencyGate {
        &self.gate
    }

    /// Process one inbound message.
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Dispatch {
        if let Some(upstream) = self.topics.availability(topic) {
            let liveness = Liveness::from_payload(payload);
            self.gate.set(upstream, liveness);
            return Dispatch::Liveness(upstream, liveness);
        }

        let offline = self.gate.offline();
        if !offline.is_empty() {
            let names: Vec<&str> = offline.iter().map(|upstream| upstream.name()).collect();
            tracing::debug!(topic, offline = ?names, "dependencies offline, dropping message");
            return Dispatch::Gated(offline);
        }

        match self.route(topic, payload).await {
            Ok(dispatch) => dispatch,
            Err(err) => {
                tracing::warn!(topic, error = %err, "dropping message");
                Dispatch::Failed(err.to_string())
            }
        }
    }

    async fn route(&self, topic: &str, payload: &[u8]) -> Result<Dispatch, BridgeError> {
        match self.topics.classify(topic)? {
            Inbound::ClimateState(area) => self.on_climate_state(area, payload).await,
            Inbound::BusFrame => self.on_bus_frame(payload).await,
            Inbound::BusResponse(id) => self.on_bus_response(id, payload),
            Inbound::Unroutable => {
                tracing::debug!(topic, "no route for topic");
                Ok(Dispatch::Ignored("unroutable topic"))
            }
        }
    }

    async fn on_climate_state(&self, area: AreaId, payload: &[u8]) -> Result<Dispatch, BridgeError> {
        let incoming: ClimatePayload =
            serde_json::from_slice(payload).map_err(BridgeError::Payload)?;
        let applied = self.cache.apply(area, incoming)?;
        tracing::debug!(
            %area,
            setpoint = applied.state.setpoint,
            current_temperature = applied.state.current_temperature,
            hvac_mode = %applied.state.hvac_mode,
            fan_mode = %applied.state.fan_mode,
            status = %applied.state.status,
            "climate state received"
        );

        if applied.changes.is_empty() {
            tracing::debug!(%area, "climate state unchanged");
            return Ok(Dispatch::Published(0));
        }
        let published = self.publish_changes(area, &applied.state, &applied.changes).await;
        Ok(Dispatch::Published(published))
    }

    async fn on_bus_frame(&self, payload: &[u8]) -> Result<Dispatch, BridgeError> {
        let frame: BusFrame = serde_json::from_slice(payload).map_err(BridgeError::Payload)?;
        let command = match BusCommand::classify(&frame)? {
            Classified::OwnEcho => return Ok(Dispatch::Ignored("own echo")),
            Classified::Unrecognized => {
                tracing::debug!(description = %frame.description, "unrecognized bus frame");
                return Ok(Dispatch::Ignored("unrecognized frame"));
            }
            Classified::Command(command) => command,
        };
        tracing::debug!(?command, "bus command received");

        match command {
            BusCommand::RequestSetpoint { area, .. } => {
                let Some(applied) = self.cache.force_resend(area) else {
                    return Ok(Dispatch::Ignored("no cached state"));
                };
                let published = self.publish_changes(area, &applied.state, &applied.changes).await;
                Ok(Dispatch::Published(published))
            }
            BusCommand::SetSetpoint { area, setpoint, .. } => {
                if !self.cache.has_snapshot(area) {
                    tracing::warn!(%area, setpoint, "setpoint for area without cached state");
                    return Ok(Dispatch::Ignored("unknown area"));
                }
                let topic = self.topics.climate_set_topic(area, ClimateTarget::Temperature);
                if !self.publish_climate(&topic, &setpoint.to_string()).await {
                    return Ok(Dispatch::Published(0));
                }
                if !self.cache.set_setpoint(area, setpoint) {
                    tracing::debug!(%area, "cached state dropped before setpoint write");
                }
                Ok(Dispatch::Published(1))
            }
            BusCommand::RecallLevel {
                area,
                channel,
                level,
                ..
            } => Ok(self.on_recall(area, channel, level).await),
        }
    }

    async fn on_recall(&self, area: AreaId, channel: u16, level: i64) -> Dispatch {
        let (target, value) = match channel {
            channel::ON_OFF => {
                let mode = if level == 0 { HvacMode::Off } else { HvacMode::Auto };
                (ClimateTarget::Mode, mode.as_str())
            }
            channel::HVAC_MODE => match HvacMode::from_index(level) {
                Some(mode) => (ClimateTarget::Mode, mode.as_str()),
                None => return Dispatch::Ignored("hvac mode index out of range"),
            },
            channel::FAN_MODE => match FanMode::from_index(level) {
                Some(mode) => (ClimateTarget::FanMode, mode.as_str()),
                None => return Dispatch::Ignored("fan mode index out of range"),
            },
            _ => {
                tracing::debug!(%area, channel, level, "recall on unmapped channel");
                return Dispatch::Ignored("unmapped channel");
            }
        };

        let topic = self.topics.climate_set_topic(area, target);
        if !self.publish_climate(&topic, value).await {
            return Dispatch::Published(0);
        }

        let cached = match channel {
            channel::HVAC_MODE => self.cache.set_hvac_mode(area, value),
            channel::FAN_MODE => self.cache.set_fan_mode(area, value),
            _ => true,
        };
        if !cached {
            tracing::debug!(%area, channel, "recall for area without cached state");
        }
        Dispatch::Published(1)
    }

    fn on_bus_response(&self, id: CorrelationId, payload: &[u8]) -> Result<Dispatch, BridgeError> {
        let response: BusResponse =
            serde_json::from_slice(payload).map_err(BridgeError::Payload)?;
        Ok(Dispatch::Resolved(self.tracker.resolve(id, &response.status)))
    }

    async fn publish_changes(&self, area: AreaId, state: &AreaState, changes: &[StateField]) -> usize {
        let mut published = 0;
        for field in changes {
            tracing::debug!(%area, %field, "field changed");
            for command in self.plan(area, state, *field) {
                match command.body {
                    Ok(body) => {
                        if self.send_to_bus(&command.comment, body).await {
                            published += 1;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%area, comment = %command.comment, error = %err, "skipping bus command");
                    }
                }
            }
        }
        published
    }

    /// Bus commands mirroring one changed field.
    fn plan(&self, area: AreaId, state: &AreaState, field: StateField) -> Vec<PlannedCommand> {
        let join = self.settings.out_join;
        let address = self.settings.address;
        let channel_level = |channel: u16, level: u8| {
            dynet::encode_channel_level(area, channel, f64::from(level), join, NO_FADE, address)
        };
        let comment = |what: &str| format!("area {area} {what}");

        match field {
            StateField::Setpoint => vec![PlannedCommand {
                comment: comment("setpoint"),
                body: dynet::encode_setpoint(area, join, state.setpoint, address),
            }],
            StateField::CurrentTemperature => vec![PlannedCommand {
                comment: comment("current temperature"),
                body: dynet::encode_current_temperature(area, join, state.current_temperature, address),
            }],
            StateField::HvacMode => {
                let on = u8::from(!state.hvac_mode.eq_ignore_ascii_case(HvacMode::Off.as_str()));
                let mut commands = vec![PlannedCommand {
                    comment: comment("on/off"),
                    body: channel_level(channel::ON_OFF, on),
                }];
                match state.hvac_mode.parse::<HvacMode>() {
                    Ok(mode) => commands.push(PlannedCommand {
                        comment: comment("hvac mode"),
                        body: channel_level(channel::HVAC_MODE, mode.code()),
                    }),
                    Err(err) => tracing::warn!(%area, error = %err, "no bus command for hvac mode"),
                }
                commands
            }
            StateField::FanMode => match state.fan_mode.parse::<FanMode>() {
                Ok(mode) => vec![PlannedCommand {
                    comment: comment("fan mode"),
                    body: channel_level(channel::FAN_MODE, mode.code()),
                }],
                Err(err) => {
                    tracing::warn!(%area, error = %err, "no bus command for fan mode");
                    Vec::new()
                }
            },
            StateField::Status => vec![PlannedCommand {
                comment: comment("status"),
                body: channel_level(channel::STATUS, u8::from(!status_is_ok(&state.status))),
            }],
        }
    }

    /// Track and publish one DyNet body. Returns whether the publish went out.
    async fn send_to_bus(&self, comment: &str, body: DynetBody) -> bool {
        let response_id = self.tracker.track(comment);
        let message = BusSetMessage {
            frame_type: FrameType::Dynet2,
            hex_string: body.to_hex(),
            response_id,
        };
        let payload = match serde_json::to_vec(&message) {
            Ok(payload) => payload,
            Err(err) => {
                self.tracker.discard(response_id);
                tracing::error!(%comment, error = %err, "failed to serialize bus command");
                return false;
            }
        };

        match self.publisher.publish(&self.topics.bus_set_topic(), payload).await {
            Ok(()) => {
                tracing::info!(
                    %comment,
                    hex = %message.hex_string,
                    correlation_id = %response_id,
                    "published bus command"
                );
                true
            }
            Err(err) => {
                self.tracker.discard(response_id);
                tracing::error!(%comment, error = %err, "failed to publish bus command");
                false
            }
        }
    }

    async fn publish_climate(&self, topic: &str, value: &str) -> bool {
        match self.publisher.publish(topic, value.as_bytes().to_vec()).await {
            Ok(()) => {
                tracing::info!(topic, %value, "published climate command");
                true
            }
            Err(err) => {
                tracing::error!(topic, error = %err, "failed to publish climate command");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    impl RecordingPublisher {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn take(&self) -> Vec<(String, Vec<u8>)> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    impl MessagePublisher for RecordingPublisher {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BridgeError> {
            if self.fail {
                return Err(BridgeError::transport(std::io::Error::other("broker gone")));
            }
            self.sent.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }

    fn router(
        publisher: RecordingPublisher,
    ) -> (Router<Arc<RecordingPublisher>>, Arc<RecordingPublisher>) {
        let publisher = Arc::new(publisher);
        let router = Router::new(
            Arc::clone(&publisher),
            TopicLayout::default(),
            BridgeSettings::default(),
            StateCache::new(1),
            Arc::new(CorrelationTracker::new(Duration::from_secs(10))),
        );
        (router, publisher)
    }

    async fn open_gate<P: MessagePublisher>(router: &Router<P>) {
        router.handle("dynalite/bridge/status", b"online").await;
        router.handle("climate/bridge/status", b"online").await;
    }

    fn state_json(mode: &str, fan: &str) -> Vec<u8> {
        format!(
            r#"{{"temperature":21.75,"current_temperature":22.04,"hvac_mode":"{mode}","fan_mode":"{fan}","status":"ok"}}"#
        )
        .into_bytes()
    }

    fn bus_messages(sent: &[(String, Vec<u8>)]) -> Vec<BusSetMessage> {
        sent.iter()
            .filter(|(topic, _)| topic == "dynalite/set")
            .map(|(_, payload)| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn should_drop_messages_until_both_adapters_online() {
        let (router, publisher) = router(RecordingPublisher::default());

        router.handle("climate/bridge/status", b"online").await;
        let dispatch = router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;

        assert_eq!(dispatch, Dispatch::Gated(vec![Upstream::Dynalite]));
        assert!(!router.cache().contains(AreaId::new(3)));
        assert!(publisher.take().is_empty());
    }

    #[tokio::test]
    async fn should_publish_every_field_on_first_state() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let dispatch = router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        assert_eq!(dispatch, Dispatch::Published(6));

        let messages = bus_messages(&publisher.take());
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0].hex_string, "56 BB 00 08 00 03 FE 0D 15 4B 00 00");
        assert_eq!(messages[0].frame_type, FrameType::Dynet2);
        assert!(messages.iter().all(|m| router.tracker().contains(m.response_id)));
    }

    #[tokio::test]
    async fn should_publish_nothing_for_repeated_state() {
        let (router, _) = router(RecordingPublisher::default());
        open_gate(&router).await;

        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        let dispatch = router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        assert_eq!(dispatch, Dispatch::Published(0));
    }

    #[tokio::test]
    async fn should_publish_only_fan_channel_when_fan_changes() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;
        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        publisher.take();

        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "high"))
            .await;
        let messages = bus_messages(&publisher.take());
        assert_eq!(messages.len(), 1);
        // channel 103, level round(2 / 100 * 254) = 5
        assert_eq!(
            messages[0].hex_string,
            "10 BB 00 08 00 03 FE 02 00 67 05 00 00 00 00 00"
        );
    }

    #[tokio::test]
    async fn should_skip_mode_command_for_unknown_hvac_mode() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;
        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        publisher.take();

        let dispatch = router
            .handle("climate/hvac_area_3/state", &state_json("turbo", "auto"))
            .await;
        assert_eq!(dispatch, Dispatch::Published(1));
        assert_eq!(router.cache().snapshot(AreaId::new(3)).unwrap().hvac_mode, "turbo");
    }

    #[tokio::test]
    async fn should_reject_state_with_missing_fields() {
        let (router, _) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let dispatch = router
            .handle("climate/hvac_area_3/state", br#"{"temperature":21.0}"#)
            .await;
        assert!(matches!(dispatch, Dispatch::Failed(ref msg) if msg.contains("current_temperature")));
        assert!(!router.cache().contains(AreaId::new(3)));
    }

    #[tokio::test]
    async fn should_reject_invalid_json() {
        let (router, _) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let dispatch = router.handle("climate/hvac_area_3/state", b"not json").await;
        assert!(matches!(dispatch, Dispatch::Failed(_)));
    }

    #[tokio::test]
    async fn should_accept_temperature_sent_as_numeric_text() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let payload = br#"{"temperature":"21.5","current_temperature":21,"hvac_mode":"cool","fan_mode":"auto","status":"ok"}"#;
        let dispatch = router.handle("climate/hvac_area_3/state", payload).await;

        assert_eq!(dispatch, Dispatch::Published(6));
        assert_eq!(
            bus_messages(&publisher.take())[0].hex_string,
            "56 BB 00 08 00 03 FE 0D 15 32 00 00"
        );
    }

    #[tokio::test]
    async fn should_publish_sibling_commands_when_one_temperature_is_unconvertible() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let payload = br#"{"temperature":"warm","current_temperature":21,"hvac_mode":"cool","fan_mode":"auto","status":"ok"}"#;
        let dispatch = router.handle("climate/hvac_area_3/state", payload).await;

        assert_eq!(dispatch, Dispatch::Published(5));
        let messages = bus_messages(&publisher.take());
        assert!(messages.iter().all(|m| !m.hex_string.contains(" 0D ")));
        assert!(router.cache().has_snapshot(AreaId::new(3)));
        assert_eq!(router.tracker().len(), 5);

        // the same bad value again is not a change
        assert_eq!(
            router.handle("climate/hvac_area_3/state", payload).await,
            Dispatch::Published(0)
        );
    }

    #[tokio::test]
    async fn should_discard_tracking_when_publish_fails() {
        let (router, _) = router(RecordingPublisher::failing());
        open_gate(&router).await;

        let dispatch = router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        assert_eq!(dispatch, Dispatch::Published(0));
        assert!(router.tracker().is_empty());
    }

    #[tokio::test]
    async fn should_resolve_acknowledgement() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;
        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        let id = bus_messages(&publisher.take())[0].response_id;

        let dispatch = router
            .handle(&format!("dynalite/response/{id}"), br#"{"status":"ok"}"#)
            .await;
        assert!(matches!(
            dispatch,
            Dispatch::Resolved(Resolution::Acknowledged { ref comment, .. }) if comment == "area 3 setpoint"
        ));
        assert!(!router.tracker().contains(id));
    }

    #[tokio::test]
    async fn should_ignore_own_echo() {
        let (router, _) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let frame = br#"{"description":"Set temperature set point to 21.75, join FE","type":"dynet2","fields":[]}"#;
        assert_eq!(
            router.handle("dynalite/event", frame).await,
            Dispatch::Ignored("own echo")
        );
    }

    #[tokio::test]
    async fn should_resend_state_on_setpoint_request() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let request = br#"{"description":"Request temperature set point","type":"dynet1","fields":[3, 255]}"#;
        assert_eq!(
            router.handle("dynalite/event", request).await,
            Dispatch::Ignored("no cached state")
        );

        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        publisher.take();

        assert_eq!(
            router.handle("dynalite/event", request).await,
            Dispatch::Published(6)
        );
    }

    #[tokio::test]
    async fn should_forward_keypad_setpoint_to_climate_side() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;
        let frame = br#"{"description":"Set temperature set point to 23.5","type":"dynet1","fields":[3, 255, 23.5]}"#;

        assert_eq!(
            router.handle("dynalite/event", frame).await,
            Dispatch::Ignored("unknown area")
        );

        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        publisher.take();

        assert_eq!(router.handle("dynalite/event", frame).await, Dispatch::Published(1));
        assert_eq!(
            publisher.take(),
            vec![(
                "climate/hvac_area_3/set/temperature".to_string(),
                b"23.5".to_vec()
            )]
        );
        let cached = router.cache().snapshot(AreaId::new(3)).unwrap();
        assert!((cached.setpoint - 23.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn should_not_forward_keypad_setpoint_for_invalidated_area() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;
        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        router.cache().invalidate(AreaId::new(3));
        publisher.take();

        let frame = br#"{"description":"Set temperature set point to 23.5","type":"dynet1","fields":[3, 255, 23.5]}"#;
        assert_eq!(
            router.handle("dynalite/event", frame).await,
            Dispatch::Ignored("unknown area")
        );
        assert!(publisher.take().is_empty());
    }

    #[tokio::test]
    async fn should_map_recalled_levels_to_modes() {
        let (router, publisher) = router(RecordingPublisher::default());
        open_gate(&router).await;
        router
            .handle("climate/hvac_area_3/state", &state_json("cool", "auto"))
            .await;
        publisher.take();

        let recall = |channel: u16, level: &str| {
            format!(
                r#"{{"description":"Recall level","type":"dynet1","fields":[3, 255, {channel}, "{level}"]}}"#
            )
        };

        router
            .handle("dynalite/event", recall(102, "1%").as_bytes())
            .await;
        router
            .handle("dynalite/event", recall(103, "2%").as_bytes())
            .await;
        router
            .handle("dynalite/event", recall(101, "0%").as_bytes())
            .await;

        assert_eq!(
            publisher.take(),
            vec![
                ("climate/hvac_area_3/set/mode".to_string(), b"heat".to_vec()),
                ("climate/hvac_area_3/set/fan_mode".to_string(), b"high".to_vec()),
                ("climate/hvac_area_3/set/mode".to_string(), b"off".to_vec()),
            ]
        );
        let cached = router.cache().snapshot(AreaId::new(3)).unwrap();
        assert_eq!(cached.hvac_mode, "heat");
        assert_eq!(cached.fan_mode, "high");
    }

    #[tokio::test]
    async fn should_ignore_out_of_range_recall() {
        let (router, _) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let frame = br#"{"description":"Recall level","type":"dynet1","fields":[3, 255, 102, "9%"]}"#;
        assert_eq!(
            router.handle("dynalite/event", frame).await,
            Dispatch::Ignored("hvac mode index out of range")
        );
    }

    #[tokio::test]
    async fn should_fail_on_wrong_field_count() {
        let (router, _) = router(RecordingPublisher::default());
        open_gate(&router).await;

        let frame = br#"{"description":"Recall level","type":"dynet2","fields":[3, 255, 102]}"#;
        assert!(matches!(
            router.handle("dynalite/event", frame).await,
            Dispatch::Failed(_)
        ));
    }
}
