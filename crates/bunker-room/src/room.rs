//! Room actor: an isolated Tokio task that owns one room.
//!
//! The actor holds the roster, the lobby settings, and once the host starts
//! a game the boxed [`GameEngine`] plus the [`PhaseTimer`] mirroring its
//! deadline. Commands arrive on an mpsc channel; the ones that need an
//! answer carry a oneshot reply channel. The timer fires into the same
//! `select!` loop, so actions and expiries never overlap.

use bunker_engine::{
    GameEngine, GameError, GameView, Phase, PlayerPresence, RoomContext, Scenario, SeatedPlayer,
    SessionSetup, start_session,
};
use bunker_protocol::{ActionOutcome, GameAction, GameEvent, PlayerId, RoomCode};
use bunker_timer::{PhaseTimer, TimerFired};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::{GameResources, LobbySettings, LobbyUpdate, RoomConfig, RoomError, RoomState};

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// What a room pushes to a member's connection.
#[derive(Debug, Clone)]
pub enum RoomOutbound {
    /// Lobby roster and settings, after every lobby change.
    Lobby(LobbyView),
    /// This member's own projection of the game.
    View(Box<GameView>),
    /// Events emitted by the last action or expiry, same for everyone.
    Events(Vec<GameEvent>),
    /// The room shut down.
    Closed,
}

/// Channel sender for delivering outbound messages to a member.
pub type PlayerSender = mpsc::UnboundedSender<RoomOutbound>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyMember {
    pub player_id: PlayerId,
    pub name: String,
    pub connected: bool,
    pub is_host: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    pub room_code: RoomCode,
    pub state: RoomState,
    pub host_id: Option<PlayerId>,
    pub members: Vec<LobbyMember>,
    pub settings: LobbySettings,
    pub max_players: usize,
}

/// A snapshot of room metadata (not the game itself).
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_code: RoomCode,
    pub state: RoomState,
    pub host_id: Option<PlayerId>,
    pub player_count: usize,
    pub max_players: usize,
    pub scenario: Scenario,
    /// `None` before the game starts.
    pub phase: Option<Phase>,
}

/// What happened to a member who asked to leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Dropped from the roster (lobby). `false` means the seat is kept and
    /// only marked disconnected (game in progress).
    pub removed: bool,
    /// Nobody connected is left; the room can be closed.
    pub room_empty: bool,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub(crate) enum RoomCommand {
    /// Join the lobby, or reconnect to a seat in a running game.
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },

    Configure {
        player_id: PlayerId,
        update: LobbyUpdate,
        reply: oneshot::Sender<Result<LobbySettings, RoomError>>,
    },

    StartGame {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Action {
        player_id: PlayerId,
        action: GameAction,
        reply: oneshot::Sender<Result<ActionOutcome, RoomError>>,
    },

    GetView {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<GameView, RoomError>>,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Shutdown,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(
        &self,
        player_id: PlayerId,
        name: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    /// Edits lobby settings. Host only, lobby only.
    pub async fn configure(
        &self,
        player_id: PlayerId,
        update: LobbyUpdate,
    ) -> Result<LobbySettings, RoomError> {
        self.request(|reply| RoomCommand::Configure {
            player_id,
            update,
            reply,
        })
        .await?
    }

    /// Starts the game. Host only.
    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::StartGame { player_id, reply })
            .await?
    }

    /// Applies one game action as `player_id`.
    ///
    /// Members receive fresh views and the events before this returns.
    pub async fn act(
        &self,
        player_id: PlayerId,
        action: GameAction,
    ) -> Result<ActionOutcome, RoomError> {
        self.request(|reply| RoomCommand::Action {
            player_id,
            action,
            reply,
        })
        .await?
    }

    pub async fn game_view(&self, player_id: PlayerId) -> Result<GameView, RoomError> {
        self.request(|reply| RoomCommand::GetView { player_id, reply })
            .await?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

struct Member {
    id: PlayerId,
    name: String,
    sender: Option<PlayerSender>,
    presence: PlayerPresence,
}

/// Members in join order.
#[derive(Default)]
struct Roster {
    members: Vec<Member>,
}

impl Roster {
    fn get(&self, id: &PlayerId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.id == id)
    }

    fn contains(&self, id: &PlayerId) -> bool {
        self.get(id).is_some()
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn any_connected(&self) -> bool {
        self.members.iter().any(|m| m.presence.connected)
    }

    /// First connected member in join order other than `except`.
    fn next_host(&self, except: &PlayerId) -> Option<PlayerId> {
        self.members
            .iter()
            .find(|m| &m.id != except && m.presence.connected)
            .map(|m| m.id.clone())
    }

    fn broadcast(&self, msg: &RoomOutbound) {
        for sender in self.members.iter().filter_map(|m| m.sender.as_ref()) {
            let _ = sender.send(msg.clone());
        }
    }
}

impl RoomContext for Roster {
    fn presence(&self, player: &PlayerId) -> Option<PlayerPresence> {
        self.get(player).map(|m| m.presence)
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

enum Wake {
    Command(Option<RoomCommand>),
    Timer(TimerFired),
}

struct RoomActor {
    code: RoomCode,
    state: RoomState,
    config: RoomConfig,
    resources: GameResources,
    roster: Roster,
    host: Option<PlayerId>,
    lobby: LobbySettings,
    engine: Option<Box<dyn GameEngine>>,
    timer: PhaseTimer,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.code, "room actor started");

        loop {
            let wake = tokio::select! {
                cmd = self.receiver.recv() => Wake::Command(cmd),
                fired = self.timer.wait() => Wake::Timer(fired),
            };
            match wake {
                Wake::Command(Some(cmd)) => {
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Wake::Command(None) => break,
                Wake::Timer(fired) => self.handle_timer(fired),
            }
        }

        tracing::info!(room = %self.code, "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_join(player_id, name, sender));
            }
            RoomCommand::Leave { player_id, reply } => {
                let _ = reply.send(self.handle_leave(player_id));
            }
            RoomCommand::Configure {
                player_id,
                update,
                reply,
            } => {
                let _ = reply.send(self.handle_configure(&player_id, update));
            }
            RoomCommand::StartGame { player_id, reply } => {
                let _ = reply.send(self.handle_start(&player_id));
            }
            RoomCommand::Action {
                player_id,
                action,
                reply,
            } => {
                let _ = reply.send(self.handle_action(&player_id, action));
            }
            RoomCommand::GetView { player_id, reply } => {
                let _ = reply.send(self.view_for(&player_id));
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.code, "room shutting down");
                self.roster.broadcast(&RoomOutbound::Closed);
                return false;
            }
        }
        true
    }

    // -- roster -------------------------------------------------------------

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if let Some(member) = self.roster.get_mut(&player_id) {
            if member.presence.connected || self.state != RoomState::InGame {
                return Err(RoomError::AlreadyInRoom(player_id, self.code.clone()));
            }
            member.sender = Some(sender);
            member.presence = PlayerPresence {
                connected: true,
                disconnected_at: None,
            };
            tracing::info!(room = %self.code, player = %player_id, "player reconnected");
            self.push_views();
            return Ok(());
        }

        if !self.state.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot join room in state {}",
                self.state
            )));
        }
        if self.roster.len() >= self.capacity() {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        let name = match name.trim() {
            "" => player_id.to_string(),
            trimmed => trimmed.to_string(),
        };
        self.roster.members.push(Member {
            id: player_id.clone(),
            name,
            sender: Some(sender),
            presence: PlayerPresence {
                connected: true,
                disconnected_at: None,
            },
        });
        if self.host.is_none() {
            self.host = Some(player_id.clone());
        }
        tracing::info!(
            room = %self.code,
            player = %player_id,
            players = self.roster.len(),
            "player joined"
        );
        self.push_lobby();
        Ok(())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        if !self.roster.contains(&player_id) {
            return Err(RoomError::NotInRoom(player_id, self.code.clone()));
        }

        let removed = self.state != RoomState::InGame;
        if removed {
            self.roster.members.retain(|m| m.id != player_id);
        } else if let Some(member) = self.roster.get_mut(&player_id) {
            member.sender = None;
            member.presence = PlayerPresence {
                connected: false,
                disconnected_at: Some(self.resources.clock.now_ms()),
            };
        }
        tracing::info!(
            room = %self.code,
            player = %player_id,
            removed,
            "player left"
        );

        if self.host.as_ref() == Some(&player_id) {
            self.transfer_host(&player_id);
        }

        let room_empty = !self.roster.any_connected();
        if !room_empty {
            if self.engine.is_some() {
                self.push_views();
            } else {
                self.push_lobby();
            }
        }
        Ok(LeaveOutcome {
            removed,
            room_empty,
        })
    }

    fn transfer_host(&mut self, leaving: &PlayerId) {
        let Some(next) = self.roster.next_host(leaving) else {
            if self.state != RoomState::InGame {
                self.host = None;
            }
            return;
        };
        tracing::info!(room = %self.code, from = %leaving, to = %next, "host transferred");
        if let Some(engine) = self.engine.as_mut() {
            engine.set_host_id(next.clone());
        }
        self.host = Some(next);
    }

    // -- lobby --------------------------------------------------------------

    fn handle_configure(
        &mut self,
        player_id: &PlayerId,
        update: LobbyUpdate,
    ) -> Result<LobbySettings, RoomError> {
        self.require_host(player_id)?;
        if self.state != RoomState::Lobby {
            return Err(RoomError::InvalidState(
                "settings can only be changed in the lobby".into(),
            ));
        }
        if update.scenario.is_some_and(Scenario::is_dev) && !self.config.allow_dev_scenarios {
            return Err(RoomError::InvalidState("dev scenarios are disabled".into()));
        }

        self.lobby.apply(update);
        tracing::debug!(room = %self.code, scenario = %self.lobby.scenario, "lobby settings updated");
        self.push_lobby();
        Ok(self.lobby.clone())
    }

    fn handle_start(&mut self, player_id: &PlayerId) -> Result<(), RoomError> {
        self.require_host(player_id)?;
        if self.state != RoomState::Lobby {
            return Err(RoomError::InvalidState(format!(
                "cannot start a game in state {}",
                self.state
            )));
        }
        let scenario = self.lobby.scenario;
        let min = self.config.min_players_for(scenario);
        if self.roster.len() < min {
            return Err(RoomError::InvalidState(format!(
                "need at least {min} players to start"
            )));
        }

        let seated: Vec<SeatedPlayer> = self
            .roster
            .members
            .iter()
            .map(|m| SeatedPlayer::new(m.id.clone(), m.name.clone()))
            .collect();
        let ruleset = self.lobby.ruleset.resolve(seated.len());
        let setup = SessionSetup::new(
            self.code.clone(),
            player_id.clone(),
            seated,
            &self.resources.assets,
            &self.resources.abilities,
        )
        .with_scenario(scenario)
        .with_settings(self.lobby.settings.clone())
        .with_ruleset(ruleset)
        .with_seed(self.resources.seed)
        .with_clock(self.resources.clock.clone())
        .with_threat_table(self.resources.threat_table.clone());

        self.engine = Some(start_session(setup));
        self.state = RoomState::InGame;
        tracing::info!(
            room = %self.code,
            %scenario,
            players = self.roster.len(),
            "game started"
        );

        self.push_views();
        self.sync_timer();
        Ok(())
    }

    // -- game ---------------------------------------------------------------

    fn handle_action(
        &mut self,
        player_id: &PlayerId,
        action: GameAction,
    ) -> Result<ActionOutcome, RoomError> {
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id.clone(), self.code.clone()));
        }
        if action.is_control_only() && self.host.as_ref() != Some(player_id) {
            tracing::debug!(
                room = %self.code,
                player = %player_id,
                action = action.name(),
                "control action from non-host rejected"
            );
            return Err(GameError::permission("Only the host can do that.").into());
        }
        let Some(engine) = self.engine.as_mut() else {
            return Err(RoomError::InvalidState("no game in progress".into()));
        };

        let name = action.name();
        let before = engine.phase();
        match engine.handle_action(player_id, action) {
            Ok(outcome) => {
                self.after_engine(before, &outcome);
                Ok(outcome)
            }
            Err(err) => {
                tracing::debug!(
                    room = %self.code,
                    player = %player_id,
                    action = name,
                    kind = ?err.kind(),
                    error = %err,
                    "action rejected"
                );
                Err(err.into())
            }
        }
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let now = self.resources.clock.now_ms();
        let before = engine.phase();
        match engine.handle_timer_expired(now, fired.version) {
            Ok(outcome) => {
                tracing::debug!(
                    room = %self.code,
                    kind = %fired.kind,
                    version = fired.version,
                    changed = outcome.state_changed,
                    "timer expired"
                );
                self.after_engine(before, &outcome);
            }
            Err(err) => {
                tracing::warn!(room = %self.code, kind = %fired.kind, error = %err, "timer expiry failed");
                self.sync_timer();
            }
        }
    }

    /// Fans out the result of an engine call and re-arms the timer.
    fn after_engine(&mut self, before: Phase, outcome: &ActionOutcome) {
        if !outcome.events.is_empty() {
            self.roster
                .broadcast(&RoomOutbound::Events(outcome.events.clone()));
        }
        if outcome.state_changed {
            self.push_views();
        }
        if let Some(after) = self.engine.as_ref().map(|e| e.phase()) {
            if after != before {
                tracing::info!(room = %self.code, from = %before, to = %after, "phase changed");
                if after == Phase::Ended {
                    tracing::info!(room = %self.code, "game ended");
                }
            }
        }
        self.sync_timer();
    }

    fn sync_timer(&mut self) {
        let armed = self.engine.as_ref().and_then(|e| e.current_timer());
        self.timer.sync(armed, self.resources.clock.now_ms());
    }

    fn view_for(&self, player_id: &PlayerId) -> Result<GameView, RoomError> {
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id.clone(), self.code.clone()));
        }
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| RoomError::InvalidState("no game in progress".into()))?;
        Ok(engine.build_game_view(&self.roster, player_id))
    }

    // -- outbound -----------------------------------------------------------

    fn push_views(&self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        for member in &self.roster.members {
            let Some(sender) = member.sender.as_ref() else {
                continue;
            };
            let view = engine.build_game_view(&self.roster, &member.id);
            let _ = sender.send(RoomOutbound::View(Box::new(view)));
        }
    }

    fn push_lobby(&self) {
        self.roster
            .broadcast(&RoomOutbound::Lobby(self.lobby_view()));
    }

    fn lobby_view(&self) -> LobbyView {
        LobbyView {
            room_code: self.code.clone(),
            state: self.state,
            host_id: self.host.clone(),
            members: self
                .roster
                .members
                .iter()
                .map(|m| LobbyMember {
                    player_id: m.id.clone(),
                    name: m.name.clone(),
                    connected: m.presence.connected,
                    is_host: self.host.as_ref() == Some(&m.id),
                })
                .collect(),
            settings: self.lobby.clone(),
            max_players: self.capacity(),
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.code.clone(),
            state: self.state,
            host_id: self.host.clone(),
            player_count: self.roster.len(),
            max_players: self.capacity(),
            scenario: self.lobby.scenario,
            phase: self.engine.as_ref().map(|e| e.phase()),
        }
    }

    // -- helpers ------------------------------------------------------------

    fn require_host(&self, player_id: &PlayerId) -> Result<(), RoomError> {
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id.clone(), self.code.clone()));
        }
        if self.host.as_ref() != Some(player_id) {
            return Err(RoomError::InvalidState(format!(
                "only the host can do that (host is {})",
                self.host.as_ref().map_or("nobody", PlayerId::as_str)
            )));
        }
        Ok(())
    }

    /// Roster cap: the host's `maxPlayers`, never above the room limit.
    fn capacity(&self) -> usize {
        let wanted = usize::try_from(self.lobby.settings.max_players).unwrap_or(usize::MAX);
        wanted.clamp(1, self.config.max_players)
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(code: RoomCode, config: RoomConfig, resources: GameResources) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let actor = RoomActor {
        code: code.clone(),
        state: RoomState::Lobby,
        timer: PhaseTimer::new(config.timer.clone()),
        config,
        resources,
        roster: Roster::default(),
        host: None,
        lobby: LobbySettings::default(),
        engine: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
