//! Line-oriented console for driving the agent without a chat platform.
//!
//! ```text
//! join <user_id> <username> [role_id...]
//! leave <user_id> <username>
//! say <text...>
//! drop
//! status
//! quit
//! ```

use herald_types::{Member, MembershipEvent};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// A simulated voice-state update.
    Membership(MembershipEvent),
    /// Speak arbitrary text.
    Say(String),
    /// Simulate the platform dropping the voice connection.
    Drop,
    Status,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid id: {0}")]
    InvalidId(String),
}

fn parse_id(raw: &str) -> Result<u64, ConsoleError> {
    raw.parse()
        .map_err(|_| ConsoleError::InvalidId(raw.to_string()))
}

fn parse_member<'a>(
    mut args: impl Iterator<Item = &'a str>,
    usage: &'static str,
) -> Result<Member, ConsoleError> {
    let id = parse_id(args.next().ok_or(ConsoleError::Usage(usage))?)?;
    let username = args.next().ok_or(ConsoleError::Usage(usage))?.to_string();
    let roles = args.map(parse_id).collect::<Result<Vec<_>, _>>()?;
    Ok(Member {
        id,
        username,
        roles,
    })
}

/// Parses one console line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str, channel_id: u64) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args = rest.split_whitespace();

    let command = match verb {
        "join" => ConsoleCommand::Membership(MembershipEvent {
            member: parse_member(args, "join <user_id> <username> [role_id...]")?,
            old_channel: None,
            new_channel: Some(channel_id),
        }),
        "leave" => ConsoleCommand::Membership(MembershipEvent {
            member: parse_member(args, "leave <user_id> <username>")?,
            old_channel: Some(channel_id),
            new_channel: None,
        }),
        "say" => {
            let text = rest.trim();
            if text.is_empty() {
                return Err(ConsoleError::Usage("say <text...>"));
            }
            ConsoleCommand::Say(text.to_string())
        }
        "drop" => ConsoleCommand::Drop,
        "status" => ConsoleCommand::Status,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_with_roles() {
        let cmd = parse_line("join 12 ayse 5 6", 900).unwrap().unwrap();
        match cmd {
            ConsoleCommand::Membership(event) => {
                assert!(event.is_join(900));
                assert_eq!(event.member.id, 12);
                assert_eq!(event.member.username, "ayse");
                assert_eq!(event.member.roles, vec![5, 6]);
            }
            other => panic!("expected membership, got {:?}", other),
        }
    }

    #[test]
    fn leave_is_not_a_join() {
        match parse_line("leave 12 ayse", 900).unwrap().unwrap() {
            ConsoleCommand::Membership(event) => assert!(!event.is_join(900)),
            other => panic!("expected membership, got {:?}", other),
        }
    }

    #[test]
    fn say_keeps_spacing() {
        assert_eq!(
            parse_line("say  merhaba   dünya ", 1).unwrap(),
            Some(ConsoleCommand::Say("merhaba   dünya".to_string()))
        );
        assert_eq!(
            parse_line("say", 1),
            Err(ConsoleError::Usage("say <text...>"))
        );
    }

    #[test]
    fn simple_verbs_and_blanks() {
        assert_eq!(parse_line("drop", 1).unwrap(), Some(ConsoleCommand::Drop));
        assert_eq!(parse_line("status", 1).unwrap(), Some(ConsoleCommand::Status));
        assert_eq!(parse_line("exit", 1).unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(parse_line("   ", 1).unwrap(), None);
        assert_eq!(parse_line("# comment", 1).unwrap(), None);
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse_line("dance", 1),
            Err(ConsoleError::UnknownCommand("dance".to_string()))
        );
        assert!(matches!(parse_line("join", 1), Err(ConsoleError::Usage(_))));
        assert_eq!(
            parse_line("join abc ayse", 1),
            Err(ConsoleError::InvalidId("abc".to_string()))
        );
        assert_eq!(
            parse_line("join 1 ayse x", 1),
            Err(ConsoleError::InvalidId("x".to_string()))
        );
    }
}
