/// A parsed chat command. Argument lists are whitespace-split; notice bodies keep
/// their line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
    History,
    History365,
    Add(Vec<String>),
    Edit(Vec<String>),
    Delete(Vec<String>),
    DeleteAll,
    DeleteHistory,
    Confirm,
    Mute(Vec<String>),
    Unmute(Vec<String>),
    Notice(String),
    AdminNotice(String),
    UserCount,
    Admin(Vec<String>),
    AdminRoom(Vec<String>),
    AdminList,
    AdminDelete(Vec<String>),
    Unknown(String),
}

impl Command {
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::Add(_)
                | Command::Edit(_)
                | Command::Delete(_)
                | Command::DeleteAll
                | Command::DeleteHistory
                | Command::Mute(_)
                | Command::Unmute(_)
                | Command::Notice(_)
                | Command::AdminNotice(_)
                | Command::UserCount
                | Command::AdminList
                | Command::AdminDelete(_)
        )
    }
}

/// Returns `None` for plain text. A `@botname` suffix on the command is ignored.
pub fn route_command(text: &str) -> Option<Command> {
    let trimmed = text.trim_start();
    let body = trimmed.strip_prefix('/')?;
    let (head, rest) = match body.find(char::is_whitespace) {
        Some(idx) => (&body[..idx], &body[idx..]),
        None => (body, ""),
    };
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    let args = || rest.split_whitespace().map(str::to_string).collect::<Vec<_>>();
    let remainder = || rest.trim().to_string();

    let command = match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "list" => Command::List,
        "history" => Command::History,
        "history365" => Command::History365,
        "add" => Command::Add(args()),
        "edit" => Command::Edit(args()),
        "del" => Command::Delete(args()),
        "delall" => Command::DeleteAll,
        "delhistory" => Command::DeleteHistory,
        "ok" => Command::Confirm,
        "mute" => Command::Mute(args()),
        "unmute" => Command::Unmute(args()),
        "noti" => Command::Notice(remainder()),
        "adminnoti" => Command::AdminNotice(remainder()),
        "user" => Command::UserCount,
        "admin" => Command::Admin(args()),
        "adminroom" => Command::AdminRoom(args()),
        "adminlist" => Command::AdminList,
        "admindel" => Command::AdminDelete(args()),
        _ => Command::Unknown(name),
    };
    Some(command)
}

/// First argument as a 1-based ordinal.
pub fn parse_ordinal(args: &[String]) -> Option<usize> {
    args.first()?.parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(route_command("hello there"), None);
        assert_eq!(route_command(""), None);
    }

    #[test]
    fn splits_arguments() {
        assert_eq!(
            route_command("/add 250101 0900 new year"),
            Some(Command::Add(vec![
                "250101".to_string(),
                "0900".to_string(),
                "new".to_string(),
                "year".to_string()
            ]))
        );
        assert_eq!(route_command("/del 3"), Some(Command::Delete(vec!["3".to_string()])));
    }

    #[test]
    fn strips_bot_mention() {
        assert_eq!(route_command("/list@schedule_bot"), Some(Command::List));
        assert_eq!(route_command("/OK"), Some(Command::Confirm));
    }

    #[test]
    fn notice_keeps_line_breaks() {
        assert_eq!(
            route_command("/noti line one\nline two "),
            Some(Command::Notice("line one\nline two".to_string()))
        );
        assert_eq!(route_command("/noti"), Some(Command::Notice(String::new())));
    }

    #[test]
    fn gating() {
        assert!(route_command("/delall").unwrap().requires_admin());
        assert!(route_command("/user").unwrap().requires_admin());
        assert!(!route_command("/list").unwrap().requires_admin());
        assert!(!route_command("/ok").unwrap().requires_admin());
        assert!(!route_command("/adminroom pw room").unwrap().requires_admin());
    }

    #[test]
    fn ordinal_parsing() {
        assert_eq!(parse_ordinal(&["4".to_string()]), Some(4));
        assert_eq!(parse_ordinal(&["four".to_string()]), None);
        assert_eq!(parse_ordinal(&[]), None);
    }
}
