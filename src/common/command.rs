//! ESP-AT command lines.
//!
//! Commands are composed from a template with `{}` placeholders and typed
//! arguments, validated, and stored in a bounded [`CommandLine`]. The line
//! terminator (CRLF) is appended by the transaction engine, not here.

use arrayvec::ArrayString;
use core::fmt::{self, Write};
use core::time::Duration;

use super::timing;

/// Maximum length of a composed command line, terminator excluded.
pub const MAX_COMMAND_LEN: usize = 256;

/// A composed, validated command line.
pub type CommandLine = ArrayString<MAX_COMMAND_LEN>;

/// Reasons a command line could not be composed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandFormatError {
    /// The template has more `{}` placeholders than arguments were given.
    MissingArgument,
    /// More arguments were given than the template has placeholders.
    UnusedArgument,
    /// The composed line does not fit in [`MAX_COMMAND_LEN`].
    TooLong,
    /// An argument contains CR or LF, which would split the command.
    LineBreak,
    /// The template or the composed line is empty.
    Empty,
}

impl fmt::Display for CommandFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CommandFormatError::*;
        match self {
            MissingArgument => write!(f, "template has an unfilled placeholder"),
            UnusedArgument => write!(f, "argument without a placeholder"),
            TooLong => write!(f, "command exceeds {} bytes", MAX_COMMAND_LEN),
            LineBreak => write!(f, "argument contains a line break"),
            Empty => write!(f, "empty command"),
        }
    }
}

/// An explicitly typed command argument.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arg<'a> {
    /// Inserted verbatim.
    Text(&'a str),
    /// Wrapped in double quotes; `"`, `,` and `\` are backslash-escaped.
    Quoted(&'a str),
    Unsigned(u32),
    Signed(i32),
}

impl Arg<'_> {
    fn has_line_break(&self) -> bool {
        match self {
            Arg::Text(s) | Arg::Quoted(s) => s.bytes().any(|b| b == b'\r' || b == b'\n'),
            Arg::Unsigned(_) | Arg::Signed(_) => false,
        }
    }
}

impl fmt::Display for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Text(s) => f.write_str(s),
            Arg::Quoted(s) => {
                f.write_char('"')?;
                for c in s.chars() {
                    if matches!(c, '"' | ',' | '\\') {
                        f.write_char('\\')?;
                    }
                    f.write_char(c)?;
                }
                f.write_char('"')
            }
            Arg::Unsigned(n) => write!(f, "{}", n),
            Arg::Signed(n) => write!(f, "{}", n),
        }
    }
}

/// Maximum number of arguments a builder accepts.
const MAX_ARGS: usize = 4;

/// Composes a command line from a template and typed arguments.
///
/// ```
/// use wxlink::common::command::{Arg, CommandBuilder};
/// let line = CommandBuilder::new("AT+CIPSTART={},{},{}")
///     .arg(Arg::Quoted("TCP"))
///     .arg(Arg::Quoted("wttr.in"))
///     .arg(Arg::Unsigned(80))
///     .build()
///     .unwrap();
/// assert_eq!(line.as_str(), r#"AT+CIPSTART="TCP","wttr.in",80"#);
/// ```
#[derive(Debug, Clone)]
pub struct CommandBuilder<'a> {
    template: &'a str,
    args: arrayvec::ArrayVec<Arg<'a>, MAX_ARGS>,
    overflow: bool,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(template: &'a str) -> Self {
        CommandBuilder {
            template,
            args: arrayvec::ArrayVec::new(),
            overflow: false,
        }
    }

    pub fn arg(mut self, arg: Arg<'a>) -> Self {
        if self.args.try_push(arg).is_err() {
            self.overflow = true;
        }
        self
    }

    pub fn build(&self) -> Result<CommandLine, CommandFormatError> {
        if self.template.is_empty() {
            return Err(CommandFormatError::Empty);
        }
        if self.overflow {
            return Err(CommandFormatError::UnusedArgument);
        }
        if self.args.iter().any(Arg::has_line_break) {
            return Err(CommandFormatError::LineBreak);
        }

        let mut line = CommandLine::new();
        let mut args = self.args.iter();
        let mut pieces = self.template.split("{}");
        // split always yields at least one piece
        let first = pieces.next().unwrap_or("");
        line.try_push_str(first).map_err(|_| CommandFormatError::TooLong)?;
        for piece in pieces {
            let arg = args.next().ok_or(CommandFormatError::MissingArgument)?;
            write!(line, "{}", arg).map_err(|_| CommandFormatError::TooLong)?;
            line.try_push_str(piece).map_err(|_| CommandFormatError::TooLong)?;
        }
        if args.next().is_some() {
            return Err(CommandFormatError::UnusedArgument);
        }
        if line.bytes().any(|b| b == b'\r' || b == b'\n') {
            return Err(CommandFormatError::LineBreak);
        }
        Ok(line)
    }
}

/// The command set the connectivity sequence uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand<'a> {
    /// Liveness check (`AT`).
    Attention,
    /// Station (client) mode (`AT+CWMODE=1`).
    StationMode,
    /// Join an access point (`AT+CWJAP="ssid","password"`).
    JoinAccessPoint { ssid: &'a str, password: &'a str },
    /// Query the local address (`AT+CIFSR`).
    QueryAddress,
    /// Open a TCP connection (`AT+CIPSTART="TCP","host",port`).
    OpenTcp { host: &'a str, port: u16 },
    /// Announce a payload of `n` bytes (`AT+CIPSEND=n`); answered with `>`.
    SendLength(usize),
    /// Close the connection (`AT+CIPCLOSE`).
    Close,
}

impl<'a> AtCommand<'a> {
    pub fn builder(&self) -> CommandBuilder<'a> {
        match *self {
            AtCommand::Attention => CommandBuilder::new("AT"),
            AtCommand::StationMode => CommandBuilder::new("AT+CWMODE={}").arg(Arg::Unsigned(1)),
            AtCommand::JoinAccessPoint { ssid, password } => CommandBuilder::new("AT+CWJAP={},{}")
                .arg(Arg::Quoted(ssid))
                .arg(Arg::Quoted(password)),
            AtCommand::QueryAddress => CommandBuilder::new("AT+CIFSR"),
            AtCommand::OpenTcp { host, port } => CommandBuilder::new("AT+CIPSTART={},{},{}")
                .arg(Arg::Quoted("TCP"))
                .arg(Arg::Quoted(host))
                .arg(Arg::Unsigned(port as u32)),
            AtCommand::SendLength(len) => CommandBuilder::new("AT+CIPSEND={}")
                .arg(Arg::Unsigned(u32::try_from(len).unwrap_or(u32::MAX))),
            AtCommand::Close => CommandBuilder::new("AT+CIPCLOSE"),
        }
    }

    /// Composes the command line.
    pub fn format_into(&self) -> Result<CommandLine, CommandFormatError> {
        self.builder().build()
    }

    /// Substring that marks a successful response.
    pub fn expected(&self) -> &'static str {
        match self {
            AtCommand::JoinAccessPoint { .. } => "WIFI GOT IP",
            AtCommand::SendLength(_) => ">",
            _ => "OK",
        }
    }

    /// Default response timeout.
    pub fn default_timeout(&self) -> Duration {
        match self {
            AtCommand::Attention => timing::ATTENTION_TIMEOUT,
            AtCommand::StationMode => timing::STATION_MODE_TIMEOUT,
            AtCommand::JoinAccessPoint { .. } => timing::JOIN_TIMEOUT,
            AtCommand::QueryAddress => timing::QUERY_ADDRESS_TIMEOUT,
            AtCommand::OpenTcp { .. } => timing::OPEN_TCP_TIMEOUT,
            AtCommand::SendLength(_) => timing::SEND_PROMPT_TIMEOUT,
            AtCommand::Close => timing::CLOSE_TIMEOUT,
        }
    }
}
