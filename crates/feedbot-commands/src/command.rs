//! Command parsing.
//!
//! The first word picks the command, ignoring case, a leading `/` and a
//! Telegram-style `@botname` suffix. Anything unrecognised is `Help`.

/// A parsed chat command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `sub|subscribe|add <url>...`
    Subscribe(Vec<String>),
    /// `unsub|unsubscribe|rm <url-or-title>`.
    ///
    /// `url` is the first argument, `query` all arguments joined by a space.
    Unsubscribe { url: String, query: String },
    /// `list|show|subs`
    List,
    /// `update`: poll all feeds now.
    Update,
    /// `start|help` or anything else.
    Help,
}

impl Command {
    /// Parse message text. Returns `None` for an empty message.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?;
        let args: Vec<String> = words.map(str::to_string).collect();

        let name = head.strip_prefix('/').unwrap_or(head);
        let name = name.split('@').next().unwrap_or(name).to_lowercase();

        let command = match name.as_str() {
            "sub" | "subscribe" | "add" => Command::Subscribe(args),
            "unsub" | "unsubscribe" | "rm" => Command::Unsubscribe {
                url: args.first().cloned().unwrap_or_default(),
                query: args.join(" "),
            },
            "list" | "show" | "subs" => Command::List,
            "update" => Command::Update,
            _ => Command::Help,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_none() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("   \n\t"), None);
    }

    #[test]
    fn test_subscribe_aliases() {
        for text in ["sub a b", "/subscribe a b", "ADD a b", "/Sub@FeedBot a b"] {
            assert_eq!(
                Command::parse(text),
                Some(Command::Subscribe(vec!["a".into(), "b".into()])),
                "{text}"
            );
        }
        assert_eq!(Command::parse("sub"), Some(Command::Subscribe(vec![])));
    }

    #[test]
    fn test_unsubscribe_url_and_query() {
        assert_eq!(
            Command::parse("/rm Tech   News daily"),
            Some(Command::Unsubscribe {
                url: "Tech".into(),
                query: "Tech News daily".into(),
            })
        );
        assert_eq!(
            Command::parse("unsub"),
            Some(Command::Unsubscribe {
                url: String::new(),
                query: String::new(),
            })
        );
    }

    #[test]
    fn test_list_update_help() {
        assert_eq!(Command::parse("list"), Some(Command::List));
        assert_eq!(Command::parse("/show"), Some(Command::List));
        assert_eq!(Command::parse("subs"), Some(Command::List));
        assert_eq!(Command::parse("/update@bot"), Some(Command::Update));
        assert_eq!(Command::parse("/start"), Some(Command::Help));
        assert_eq!(Command::parse("help"), Some(Command::Help));
        assert_eq!(Command::parse("what is this"), Some(Command::Help));
    }
}
