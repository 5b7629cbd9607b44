//! Line-oriented front end: parses commands from stdin, hands them to the
//! portal controller and prints what comes back.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use crate::services::portal::{dispatch, Action, Outcome, PortalRequest};
use crate::services::ServiceError;
use crate::views::{render_notice, Page};

pub const HELP: &str = "\
Commands:
  <page>                       dashboard, challenges, events, rewards, my-rewards,
                               history, leaderboard, profile, ecopoints, change-password
  store <store-id>             show a store's products
  product <store-id> <id>      show a product
  buy <store-id> <id>          open the purchase dialog
  confirm <store-id> <id>      confirm a purchase
  check-in                     claim today's check-in bonus
  complete <challenge-id>      complete a daily challenge
  rsvp <event-id>              RSVP to an event
  qr <reward-id>               show a reward's QR code
  use <reward-id>              mark a reward as used
  password <new-password>      change your password
  avatar <file>                upload a profile picture
  theme                        toggle light/dark mode
  refresh                      reload everything
  logout                       sign out
  quit                         exit";

pub type Input = Lines<BufReader<Stdin>>;

pub fn input() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Action(Action),
    Help,
    Quit,
}

/// How the shell loop ended.
#[derive(Debug, PartialEq)]
pub enum Exit {
    Quit,
    SignedOut,
}

fn args<const N: usize>(command: &str, rest: &[&str]) -> Result<[String; N], String> {
    if rest.len() != N {
        return Err(format!("Usage error for '{}'. Type 'help'.", command));
    }
    let mut out: [String; N] = std::array::from_fn(|_| String::new());
    for (slot, value) in out.iter_mut().zip(rest) {
        *slot = value.to_string();
    }
    Ok(out)
}

pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let (command, remainder) = match line.split_once(char::is_whitespace) {
        Some((command, remainder)) => (command, remainder.trim()),
        None => (line, ""),
    };
    let rest: Vec<&str> = remainder.split_whitespace().collect();

    let action = match command {
        "" => return Ok(None),
        "help" | "?" => return Ok(Some(Command::Help)),
        "quit" | "exit" => return Ok(Some(Command::Quit)),
        "store" => {
            let [store_id] = args(command, &rest)?;
            Action::ShowStore { store_id }
        }
        "product" => {
            let [store_id, product_id] = args(command, &rest)?;
            Action::ShowProduct {
                store_id,
                product_id,
            }
        }
        "buy" => {
            let [store_id, product_id] = args(command, &rest)?;
            Action::OpenPurchase {
                store_id,
                product_id,
            }
        }
        "confirm" => {
            let [store_id, product_id] = args(command, &rest)?;
            Action::ConfirmPurchase {
                store_id,
                product_id,
            }
        }
        "check-in" | "checkin" => Action::CheckIn,
        "complete" => {
            let [challenge_id] = args(command, &rest)?;
            Action::CompleteChallenge { challenge_id }
        }
        "rsvp" => {
            let [event_id] = args(command, &rest)?;
            Action::Rsvp { event_id }
        }
        "qr" => {
            let [user_reward_id] = args(command, &rest)?;
            Action::OpenRewardQr { user_reward_id }
        }
        "use" => {
            let [user_reward_id] = args(command, &rest)?;
            Action::MarkRewardUsed { user_reward_id }
        }
        // Passwords may contain spaces.
        "password" => Action::ChangePassword(remainder.to_string()),
        "avatar" if !remainder.is_empty() => Action::UploadAvatar(PathBuf::from(remainder)),
        "theme" => Action::ToggleTheme,
        "refresh" => Action::Refresh,
        "logout" => Action::Logout,
        page => match page.parse::<Page>() {
            Ok(page) => Action::ShowPage(page),
            Err(_) => return Err(format!("Unknown command '{}'. Type 'help'.", command)),
        },
    };

    Ok(Some(Command::Action(action)))
}

pub fn format_outcome(outcome: &Outcome) -> String {
    let mut blocks = outcome.screens.clone();
    if let Some(notice) = &outcome.notice {
        blocks.push(render_notice(notice));
    }
    blocks.join("\n\n")
}

pub async fn print(stdout: &mut tokio::io::Stdout, text: &str) -> Result<(), anyhow::Error> {
    if text.is_empty() {
        return Ok(());
    }
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

/// Runs the command loop until the user quits, signs out, or the session is
/// no longer valid.
pub async fn run(
    sender: mpsc::Sender<PortalRequest>,
    lines: &mut Input,
) -> Result<Exit, anyhow::Error> {
    let mut stdout = tokio::io::stdout();

    if let Ok(outcome) = dispatch(&sender, Action::ShowPage(Page::Dashboard)).await {
        print(&mut stdout, &format_outcome(&outcome)).await?;
    }

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => return Ok(Exit::Quit),
        };

        let action = match parse_command(&line) {
            Ok(Some(Command::Action(action))) => action,
            Ok(Some(Command::Help)) => {
                print(&mut stdout, HELP).await?;
                continue;
            }
            Ok(Some(Command::Quit)) => return Ok(Exit::Quit),
            Ok(None) => continue,
            Err(message) => {
                print(&mut stdout, &message).await?;
                continue;
            }
        };

        match dispatch(&sender, action).await {
            Ok(outcome) if outcome.signed_out => return Ok(Exit::SignedOut),
            Ok(outcome) => print(&mut stdout, &format_outcome(&outcome)).await?,
            Err(ServiceError::Unauthenticated) => return Ok(Exit::SignedOut),
            Err(ServiceError::Communication(service, e)) => {
                log::error!("Lost the {} controller: {}", service, e);
                return Err(anyhow::anyhow!("{} controller stopped", service));
            }
            // Already logged by the controller.
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(line: &str) -> Action {
        match parse_command(line) {
            Ok(Some(Command::Action(action))) => action,
            other => panic!("expected an action for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn parses_pages() {
        assert_eq!(action("dashboard"), Action::ShowPage(Page::Dashboard));
        assert_eq!(action("  my-rewards "), Action::ShowPage(Page::MyRewards));
    }

    #[test]
    fn parses_actions_with_ids() {
        assert_eq!(
            action("confirm 3 17"),
            Action::ConfirmPurchase {
                store_id: "3".to_string(),
                product_id: "17".to_string(),
            }
        );
        assert_eq!(
            action("use abc"),
            Action::MarkRewardUsed {
                user_reward_id: "abc".to_string()
            }
        );
        assert_eq!(action("check-in"), Action::CheckIn);
    }

    #[test]
    fn password_keeps_inner_spaces() {
        assert_eq!(
            action("password  correct horse "),
            Action::ChangePassword("correct horse".to_string())
        );
    }

    #[test]
    fn avatar_needs_a_path() {
        assert_eq!(
            action("avatar /tmp/me.png"),
            Action::UploadAvatar(PathBuf::from("/tmp/me.png"))
        );
        assert!(parse_command("avatar").is_err());
    }

    #[test]
    fn rejects_wrong_arity_and_unknown_commands() {
        assert!(parse_command("store").is_err());
        assert!(parse_command("product 1").is_err());
        assert!(parse_command("fly").is_err());
    }

    #[test]
    fn blank_help_and_quit() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("help"), Ok(Some(Command::Help)));
        assert_eq!(parse_command("quit"), Ok(Some(Command::Quit)));
    }
}
