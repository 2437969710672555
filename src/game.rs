use log::info;
use macroquad::prelude::{get_frame_time, next_frame};
use rand::thread_rng;

use crate::config::{self, MatchConfig};
use crate::controller::InputState;
use crate::error::{ConfigError, GameError};
use crate::input;
use crate::player::{self, Player, PlayerKind};
use crate::render::Renderer;
use crate::round::{ControlSignal, Round};

/// Match-wide state shared with every round. Built once and passed by reference.
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub config: MatchConfig,
    pub players: Vec<Player>,
}

impl MatchContext {
    /// Validates the configuration and creates the players, humans first.
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let colors = player::generate_colors(config.players as usize, &mut thread_rng());
        let humans = config.humans() as usize;

        let players = colors
            .into_iter()
            .enumerate()
            .map(|(id, color)| {
                if id < humans {
                    Player::new(id, format!("Player {}", id + 1), color, PlayerKind::Human)
                } else {
                    Player::new(id, format!("Bot {}", id - humans + 1), color, PlayerKind::Bot)
                }
            })
            .collect();

        Ok(MatchContext { config, players })
    }

    pub fn reset_players(&mut self) {
        for player in self.players.iter_mut() {
            player.reset();
        }
    }

    pub fn has_humans(&self) -> bool {
        self.players.iter().any(|p| !p.is_bot())
    }

    /// Player with the most murders. None when the top two are level.
    pub fn champion(&self) -> Option<&Player> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.murders.cmp(&a.murders));
        match ranked.as_slice() {
            [first, second, ..] if first.murders == second.murders => None,
            [first, ..] => Some(first),
            [] => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Playing,
    Finished,
    Exited,
}

/// The Game struct drives a match: a sequence of rounds over a shared context
pub struct Game {
    pub context: MatchContext,
    round: Option<Round>,
    round_number: u32,
    time_accumulator: f64,
    /// One-shot presses polled but not yet seen by a simulation step.
    pending_input: InputState,
    /// Seconds the finished round has been on screen.
    intermission: Option<f64>,
    state: MatchState,
}

impl Game {
    pub fn new(config: MatchConfig) -> Result<Self, GameError> {
        let context = MatchContext::new(config)?;
        info!(
            "Match created: {} players ({} bots), {} rounds",
            context.players.len(),
            context.config.bots,
            context.config.rounds
        );
        let mut game = Game {
            context,
            round: None,
            round_number: 0,
            time_accumulator: 0.0,
            pending_input: InputState::default(),
            intermission: None,
            state: MatchState::Playing,
        };
        game.start_round(1);
        Ok(game)
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    fn start_round(&mut self, number: u32) {
        let mut rng = thread_rng();
        for player in self.context.players.iter_mut() {
            player.grant_round_allowance();
            if player.is_bot() {
                player.auto_shop(&mut rng);
            }
        }
        self.round_number = number;
        self.intermission = None;
        self.round = Some(Round::new(number, &self.context));
        info!("Starting Round {} of {}", number, self.context.config.rounds);
    }

    /// Back to round one with fresh players.
    pub fn restart(&mut self) {
        info!("Restarting match");
        self.context.reset_players();
        self.time_accumulator = 0.0;
        self.pending_input = InputState::default();
        self.state = MatchState::Playing;
        self.start_round(1);
    }

    /// Advances the match by one fixed simulation step.
    pub fn step(&mut self, input: &InputState) -> MatchState {
        if self.state != MatchState::Playing {
            return self.state;
        }
        let Some(round) = self.round.as_mut() else {
            self.state = MatchState::Finished;
            return self.state;
        };

        match round.update(&mut self.context, config::SIMULATION_DT, input) {
            ControlSignal::Continue => {}
            ControlSignal::Exit => {
                info!("Exit requested");
                self.state = MatchState::Exited;
            }
            ControlSignal::Restart => self.restart(),
            ControlSignal::RoundOver => match self.intermission {
                // The press that ended the round must not also dismiss it
                None => self.intermission = Some(0.0),
                Some(waited) => self.await_next_round(waited + config::SIMULATION_DT, input),
            },
        }
        self.state
    }

    /// Keeps the finished round on screen until a human acknowledges it, or
    /// for the bot delay when nobody is at the keyboard.
    fn await_next_round(&mut self, waited: f64, input: &InputState) {
        let ready = if self.context.has_humans() {
            input.acknowledge || input.fire
        } else {
            waited >= config::BOT_END_TURN_DELAY
        };
        if !ready {
            self.intermission = Some(waited);
            return;
        }

        self.intermission = None;
        if self.round_number < self.context.config.rounds {
            self.start_round(self.round_number + 1);
            return;
        }
        self.state = MatchState::Finished;
        match self.context.champion() {
            Some(champion) => info!("Match over: {} wins with {} kills", champion.name, champion.murders),
            None => info!("Match over: tie"),
        }
    }

    /// Feeds one rendered frame into the fixed-step loop. Presses are held
    /// until a step runs, so frames shorter than a step lose nothing.
    pub fn advance(&mut self, frame_time: f64, polled: InputState) -> MatchState {
        self.pending_input = self.pending_input.latch(polled);
        self.time_accumulator += frame_time;

        while self.time_accumulator >= config::SIMULATION_DT && self.state == MatchState::Playing {
            self.time_accumulator -= config::SIMULATION_DT;
            let input = self.pending_input;
            self.pending_input = input.without_edges();
            self.step(&input);
        }
        if self.pending_input.exit {
            self.state = MatchState::Exited;
        }
        self.state
    }

    /// Runs without a window until the match ends or `max_steps` is reached.
    pub fn run_headless(&mut self, max_steps: u64) -> MatchState {
        let input = InputState::default();
        for _ in 0..max_steps {
            if self.step(&input) != MatchState::Playing {
                break;
            }
        }
        self.state
    }

    /// Run the main game loop using the provided renderer
    pub async fn run(&mut self, renderer: &mut Renderer) {
        info!("Starting main loop...");

        while self.state == MatchState::Playing {
            self.advance(get_frame_time() as f64, input::poll_input());

            if let Some(round) = &self.round {
                renderer.draw_frame(&round.frame(), &self.context.players, None);
            }
            next_frame().await;
        }

        if self.state != MatchState::Finished {
            info!("Exiting Shellfire.");
            return;
        }

        // After the final round, show the champion and wait for ESC
        let announcement = match self.context.champion() {
            Some(champion) => format!("{} wins the match!", champion.name),
            None => "The match is a tie!".to_string(),
        };
        loop {
            if let Some(round) = &self.round {
                renderer.draw_frame(&round.frame(), &self.context.players, Some(&announcement));
            }
            if input::poll_input().exit {
                break;
            }
            next_frame().await;
        }
        info!("Exiting Shellfire.");
    }
}
