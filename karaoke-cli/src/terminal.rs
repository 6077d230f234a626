//! Terminal display sink and line-based keyboard controls.

use karaoke_core::{PlaybackState, PlayerCommand, PlayerEvent, PlayerHandle};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const HELP: &str = "Controls: t = start/pause, s = stop, q = quit (then Enter)";

/// Renders player events as terminal lines
pub struct TerminalDisplay {
    song: String,
}

impl TerminalDisplay {
    pub fn new(song: impl Into<String>) -> Self {
        Self { song: song.into() }
    }

    pub fn banner(&self) -> String {
        if self.song.is_empty() {
            format!("Karaoke\n{HELP}")
        } else {
            format!("Karaoke: {}\n{HELP}", self.song)
        }
    }

    pub fn render(event: &PlayerEvent) -> String {
        match event {
            PlayerEvent::StateChanged { state } => render_state(*state),
            PlayerEvent::LineChanged { text } if text.is_empty() => "♪".to_string(),
            PlayerEvent::LineChanged { text } => format!("♪ {text}"),
            PlayerEvent::Error { message } => format!("! {message}"),
        }
    }

    /// Write events to `out` until the player goes away, then hand `out` back
    pub async fn run<W: Write>(
        self,
        mut rx: broadcast::Receiver<PlayerEvent>,
        mut out: W,
    ) -> W {
        if let Err(e) = writeln!(out, "{}", self.banner()) {
            warn!("Failed to write to the terminal: {}", e);
            return out;
        }
        loop {
            let written = match rx.recv().await {
                Ok(event) => {
                    writeln!(out, "{}", Self::render(&event)).and_then(|()| out.flush())
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Display fell behind, skipped {} events", missed);
                    Ok(())
                }
                Err(RecvError::Closed) => break,
            };
            if let Err(e) = written {
                warn!("Failed to write to the terminal: {}", e);
                break;
            }
        }
        out
    }
}

fn render_state(state: PlaybackState) -> String {
    format!(
        "[{state}] press t to {}",
        state.control_label().to_lowercase()
    )
}

/// Map an input line to a player command
pub fn parse_command(input: &str) -> Option<PlayerCommand> {
    match input.trim().to_ascii_lowercase().as_str() {
        "t" | "p" | "toggle" | "start" | "pause" => Some(PlayerCommand::Toggle),
        "s" | "stop" | "reset" => Some(PlayerCommand::Stop),
        "q" | "quit" | "exit" => Some(PlayerCommand::Shutdown),
        _ => None,
    }
}

/// Forward stdin commands to the player; end of input quits
pub async fn read_controls(handle: PlayerHandle, cancel_token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => match parse_command(&line) {
                        Some(command) => {
                            if !handle.send(command) || command == PlayerCommand::Shutdown {
                                break;
                            }
                        }
                        None if line.trim().is_empty() => {}
                        None => println!("{HELP}"),
                    },
                    Ok(None) => {
                        debug!("Input closed");
                        handle.shutdown();
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read input: {}", e);
                        handle.shutdown();
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("t"), Some(PlayerCommand::Toggle));
        assert_eq!(parse_command(" Pause \n"), Some(PlayerCommand::Toggle));
        assert_eq!(parse_command("s"), Some(PlayerCommand::Stop));
        assert_eq!(parse_command("QUIT"), Some(PlayerCommand::Shutdown));
        assert_eq!(parse_command("rewind"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_render_lines() {
        let line = PlayerEvent::LineChanged {
            text: "Now this is a story".into(),
        };
        assert_eq!(TerminalDisplay::render(&line), "♪ Now this is a story");

        let cleared = PlayerEvent::LineChanged {
            text: String::new(),
        };
        assert_eq!(TerminalDisplay::render(&cleared), "♪");
    }

    #[test]
    fn test_render_state_uses_control_label() {
        let playing = PlayerEvent::StateChanged {
            state: PlaybackState::Playing,
        };
        assert_eq!(TerminalDisplay::render(&playing), "[playing] press t to pause");

        let idle = PlayerEvent::StateChanged {
            state: PlaybackState::Idle,
        };
        assert_eq!(TerminalDisplay::render(&idle), "[idle] press t to start");
    }

    #[tokio::test]
    async fn test_run_writes_until_closed() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(PlayerEvent::LineChanged {
            text: "Line 1".into(),
        })
        .unwrap();
        tx.send(PlayerEvent::StateChanged {
            state: PlaybackState::Idle,
        })
        .unwrap();
        drop(tx);

        let out = TerminalDisplay::new("Bel-Air").run(rx, Vec::new()).await;
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Karaoke: Bel-Air",
                HELP,
                "♪ Line 1",
                "[idle] press t to start"
            ]
        );
    }

    #[test]
    fn test_banner() {
        assert!(TerminalDisplay::new("Bel-Air").banner().starts_with("Karaoke: Bel-Air\n"));
        assert!(TerminalDisplay::new("").banner().starts_with("Karaoke\n"));
    }
}
