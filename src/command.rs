/// A bot command such as `/download@tiktok_bot https://...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub via: Option<String>,
    pub arg: Option<String>,
}

/// Parse a message into a command, if it is one.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim_start().strip_prefix('/')?;

    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, Some(rest.trim())),
        None => (text, None),
    };

    let (name, via) = match head.split_once('@') {
        Some((name, via)) => (name, Some(via.to_string())),
        None => (head, None),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(Command {
        name: name.to_lowercase(),
        via: via.filter(|via| !via.is_empty()),
        arg: rest.filter(|rest| !rest.is_empty()).map(str::to_string),
    })
}

/// Where a chat message is coming from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// What the bot should do with an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Ignore,
    Start,
    Help,
    /// `/download` with its argument, if any.
    Download(Option<String>),
    /// Plain text that should carry a link.
    Link,
}

/// Decide how to handle a message, given the bot's own username.
pub fn route(text: &str, chat: ChatKind, me: &str) -> Route {
    if text.trim().is_empty() {
        return Route::Ignore;
    }

    let command = match parse_command(text) {
        Some(command) => command,
        None if chat == ChatKind::Private => return Route::Link,
        None => return Route::Ignore,
    };

    if let Some(via) = &command.via {
        if !via.eq_ignore_ascii_case(me) {
            return Route::Ignore;
        }
    }

    // Other bots in the group may answer a bare /start too
    if chat == ChatKind::Group
        && matches!(command.name.as_str(), "start" | "help")
        && command.via.is_none()
    {
        return Route::Ignore;
    }

    match command.name.as_str() {
        "start" => Route::Start,
        "help" => Route::Help,
        "download" => Route::Download(command.arg),
        _ => Route::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "TikTokBot";

    #[test]
    fn bare_command() {
        assert_eq!(
            parse_command("/start"),
            Some(Command {
                name: "start".into(),
                via: None,
                arg: None
            })
        );
    }

    #[test]
    fn command_with_bot_and_argument() {
        let cmd = parse_command("/download@TikTokBot   https://vm.tiktok.com/x/ ").unwrap();
        assert_eq!(cmd.name, "download");
        assert_eq!(cmd.via.as_deref(), Some("TikTokBot"));
        assert_eq!(cmd.arg.as_deref(), Some("https://vm.tiktok.com/x/"));
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(parse_command("/HELP").unwrap().name, "help");
    }

    #[test]
    fn not_commands() {
        assert_eq!(parse_command("https://www.tiktok.com/@a/video/1"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/ start"), None);
        assert_eq!(parse_command("//etc/passwd"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn private_text_is_a_link_candidate() {
        assert_eq!(route("https://vm.tiktok.com/x/", ChatKind::Private, ME), Route::Link);
        assert_eq!(route("hello", ChatKind::Private, ME), Route::Link);
    }

    #[test]
    fn empty_messages_are_ignored() {
        // Photos and stickers arrive with no text
        assert_eq!(route("", ChatKind::Private, ME), Route::Ignore);
        assert_eq!(route("  \n", ChatKind::Private, ME), Route::Ignore);
    }

    #[test]
    fn unknown_commands_are_ignored() {
        assert_eq!(route("/foo", ChatKind::Private, ME), Route::Ignore);
        assert_eq!(route("/foo bar", ChatKind::Group, ME), Route::Ignore);
    }

    #[test]
    fn plain_group_text_is_ignored() {
        assert_eq!(route("https://vm.tiktok.com/x/", ChatKind::Group, ME), Route::Ignore);
    }

    #[test]
    fn start_and_help() {
        assert_eq!(route("/start", ChatKind::Private, ME), Route::Start);
        assert_eq!(route("/help", ChatKind::Private, ME), Route::Help);
        assert_eq!(route("/start", ChatKind::Group, ME), Route::Ignore);
        assert_eq!(route("/help", ChatKind::Group, ME), Route::Ignore);
        assert_eq!(route("/start@tiktokbot", ChatKind::Group, ME), Route::Start);
        assert_eq!(route("/help@TikTokBot", ChatKind::Group, ME), Route::Help);
    }

    #[test]
    fn commands_for_other_bots_are_ignored() {
        assert_eq!(route("/start@OtherBot", ChatKind::Private, ME), Route::Ignore);
        assert_eq!(
            route("/download@OtherBot https://vm.tiktok.com/x/", ChatKind::Group, ME),
            Route::Ignore
        );
    }

    #[test]
    fn download_carries_its_argument() {
        assert_eq!(
            route("/download https://vm.tiktok.com/x/", ChatKind::Group, ME),
            Route::Download(Some("https://vm.tiktok.com/x/".to_string()))
        );
        assert_eq!(route("/download", ChatKind::Private, ME), Route::Download(None));
    }
}
