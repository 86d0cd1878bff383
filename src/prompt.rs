use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use jkw_core::traits::ConfirmationPrompt;
use std::io::Write;

/// Asks on the terminal and reads a single key in raw mode.
/// `y`/Enter picks the first option; `n`, Esc and Ctrl+C decline.
pub struct TerminalPrompt;

/// Answers every question with its first option (`--yes`).
pub struct AssumeYes;

/// What a key press means while a question is open. `None` keeps waiting.
pub fn answer_for_key(key: KeyEvent, options: &[&str]) -> Option<Option<String>> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(None);
    }
    match key.code {
        KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
            Some(options.first().map(|o| (*o).to_string()))
        }
        KeyCode::Char('n' | 'N') | KeyCode::Esc | KeyCode::Char('q') => Some(None),
        _ => None,
    }
}

fn read_answer(options: &[&str]) -> std::io::Result<Option<String>> {
    terminal::enable_raw_mode()?;
    let answer = loop {
        match event::read() {
            Ok(Event::Key(key)) => {
                if let Some(answer) = answer_for_key(key, options) {
                    break Ok(answer);
                }
            }
            Ok(_) => {}
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;
    answer
}

#[async_trait]
impl ConfirmationPrompt for TerminalPrompt {
    async fn ask(&self, message: &str, options: &[&str]) -> Option<String> {
        let choice = options.first().copied().unwrap_or("Yes");
        print!("{message}\n\n{choice}? [y/N] ");
        if let Err(e) = std::io::stdout().flush() {
            tracing::warn!(error = %e, "failed to flush prompt");
        }

        let owned: Vec<String> = options.iter().map(|o| (*o).to_string()).collect();
        let answer = tokio::task::spawn_blocking(move || {
            let options: Vec<&str> = owned.iter().map(String::as_str).collect();
            read_answer(&options)
        })
        .await;
        println!();

        match answer {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to read confirmation");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "confirmation task failed");
                None
            }
        }
    }
}

#[async_trait]
impl ConfirmationPrompt for AssumeYes {
    async fn ask(&self, message: &str, options: &[&str]) -> Option<String> {
        tracing::debug!(%message, "confirmation assumed");
        Some(options.first().copied().unwrap_or("Yes").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn yes_picks_first_option() {
        assert_eq!(
            answer_for_key(press(KeyCode::Char('y')), &["Delete"]),
            Some(Some("Delete".to_string()))
        );
        assert_eq!(
            answer_for_key(press(KeyCode::Enter), &["Delete"]),
            Some(Some("Delete".to_string()))
        );
    }

    #[test]
    fn decline_keys() {
        assert_eq!(answer_for_key(press(KeyCode::Char('n')), &["Delete"]), Some(None));
        assert_eq!(answer_for_key(press(KeyCode::Esc), &["Delete"]), Some(None));
        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..press(KeyCode::Char('c'))
        };
        assert_eq!(answer_for_key(ctrl_c, &["Delete"]), Some(None));
    }

    #[test]
    fn other_keys_keep_waiting() {
        assert_eq!(answer_for_key(press(KeyCode::Char('x')), &["Delete"]), None);
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            ..press(KeyCode::Char('y'))
        };
        assert_eq!(answer_for_key(release, &["Delete"]), None);
    }

    #[tokio::test]
    async fn assume_yes_confirms() {
        assert_eq!(
            AssumeYes.ask("Delete?", &["Delete"]).await,
            Some("Delete".to_string())
        );
    }
}
