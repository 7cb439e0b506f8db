//! Command text tokenizing and recognition.

/// Split command text into arguments.
///
/// Arguments are separated by whitespace. A double- or single-quoted run
/// is one argument with the quotes stripped; an unquoted run also ends at a
/// quote character. An unterminated quote takes the rest of the line.
pub fn parse_arguments(text: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut rest = text;

    loop {
        rest = rest.trim_start();
        let Some(first) = rest.chars().next() else {
            break;
        };

        if first == '"' || first == '\'' {
            let body = &rest[1..];
            match body.find(first) {
                Some(end) => {
                    args.push(body[..end].to_string());
                    rest = &body[end + 1..];
                }
                None => {
                    if !body.is_empty() {
                        args.push(body.to_string());
                    }
                    break;
                }
            }
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'')
                .unwrap_or(rest.len());
            args.push(rest[..end].to_string());
            rest = &rest[end..];
        }
    }

    args
}

/// A recognized bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Status,
    Build { project: String, build_type: String },
    Show { project: String },
    Help,
    /// A known command lacking required arguments.
    MissingParameters,
    Unknown,
}

impl BotCommand {
    /// Recognize a command from the already-stripped message text.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text == "status" {
            return BotCommand::Status;
        }

        let mut args = parse_arguments(text).into_iter();
        match args.next().as_deref() {
            Some("build") => match (args.next(), args.next()) {
                (Some(project), Some(build_type)) => BotCommand::Build {
                    project,
                    build_type,
                },
                _ => BotCommand::MissingParameters,
            },
            Some("show") => match args.next() {
                Some(project) => BotCommand::Show { project },
                None => BotCommand::MissingParameters,
            },
            Some("help") => BotCommand::Help,
            _ => BotCommand::Unknown,
        }
    }

    /// Static label for logging and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            BotCommand::Status => "status",
            BotCommand::Build { .. } => "build",
            BotCommand::Show { .. } => "show",
            BotCommand::Help => "help",
            BotCommand::MissingParameters => "missing_parameters",
            BotCommand::Unknown => "unknown",
        }
    }
}
