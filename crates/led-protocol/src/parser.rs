//! Request line tokenizer and command registry

use crate::error::{ProtocolError, ProtocolResult};
use crate::response::Outcome;
use std::collections::BTreeMap;
use tracing::debug;

/// A registered command handler.
///
/// Handlers are plain descriptors; the state they act on is passed in
/// explicitly on every call instead of being captured.
pub trait Handler {
    /// State the handler reads or mutates
    type Target;

    fn call(&self, target: &mut Self::Target, parameter: &str) -> Outcome;
}

/// A request line split into command name and parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub name: &'a str,
    pub parameter: &'a str,
}

impl<'a> RequestLine<'a> {
    /// Split a raw line.
    ///
    /// The name runs up to the first space or `\n`. After a space, the
    /// parameter runs up to the next `\n` or the end of input. Nothing is
    /// trimmed.
    pub fn split(line: &'a str) -> Self {
        let Some(delim) = line.find(|c: char| c == ' ' || c == '\n') else {
            return Self {
                name: line,
                parameter: "",
            };
        };

        let name = &line[..delim];
        if line.as_bytes()[delim] == b'\n' {
            return Self {
                name,
                parameter: "",
            };
        }

        let rest = &line[delim + 1..];
        let end = rest.find('\n').unwrap_or(rest.len());

        Self {
            name,
            parameter: &rest[..end],
        }
    }
}

/// Name -> handler table, built once at startup and read-only afterwards
#[derive(Debug, Clone)]
pub struct CommandRegistry<H> {
    commands: BTreeMap<String, H>,
}

impl<H: Handler> CommandRegistry<H> {
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// Register a command.
    ///
    /// The name is not validated; it should be non-empty and free of spaces
    /// and newlines or it can never be looked up.
    pub fn register(&mut self, name: impl Into<String>, handler: H) -> ProtocolResult<&mut Self> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(ProtocolError::DuplicateCommand(name));
        }
        self.commands.insert(name, handler);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&H> {
        self.commands.get(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Parse a line and run the matching handler against `target`
    pub fn dispatch(&self, target: &mut H::Target, line: &str) -> Outcome {
        let request = RequestLine::split(line);

        match self.commands.get(request.name) {
            Some(handler) => handler.call(target, request.parameter),
            None => {
                debug!(command = %request.name, "Unknown command");
                Outcome::Failure
            }
        }
    }
}

impl<H: Handler> Default for CommandRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every parameter it receives and echoes it back
    #[derive(Debug, Clone, Copy)]
    struct Echo;

    impl Handler for Echo {
        type Target = Vec<String>;

        fn call(&self, target: &mut Vec<String>, parameter: &str) -> Outcome {
            target.push(parameter.to_string());
            Outcome::success(parameter)
        }
    }

    fn registry() -> CommandRegistry<Echo> {
        let mut registry = CommandRegistry::new();
        registry.register("echo", Echo).unwrap();
        registry
    }

    #[test]
    fn test_split_without_delimiter() {
        let req = RequestLine::split("ping");
        assert_eq!(req, RequestLine { name: "ping", parameter: "" });
    }

    #[test]
    fn test_split_newline_only() {
        let req = RequestLine::split("ping\n");
        assert_eq!(req, RequestLine { name: "ping", parameter: "" });
    }

    #[test]
    fn test_split_with_parameter() {
        let req = RequestLine::split("set-led-color green\n");
        assert_eq!(req.name, "set-led-color");
        assert_eq!(req.parameter, "green");
    }

    #[test]
    fn test_split_parameter_without_newline() {
        let req = RequestLine::split("set-led-rate 3");
        assert_eq!(req.parameter, "3");
    }

    #[test]
    fn test_split_keeps_inner_spaces_and_stops_at_newline() {
        let req = RequestLine::split("say hello  world\nignored");
        assert_eq!(req.name, "say");
        assert_eq!(req.parameter, "hello  world");
    }

    #[test]
    fn test_split_trailing_space_gives_empty_parameter() {
        let req = RequestLine::split("get-led-rate \n");
        assert_eq!(req.name, "get-led-rate");
        assert_eq!(req.parameter, "");
    }

    #[test]
    fn test_split_does_not_trim_carriage_return() {
        let req = RequestLine::split("get-led-rate\r\n");
        assert_eq!(req.name, "get-led-rate\r");
    }

    #[test]
    fn test_dispatch_passes_parameter() {
        let registry = registry();
        let mut seen = Vec::new();

        assert_eq!(registry.dispatch(&mut seen, "echo hi there\n"), Outcome::success("hi there"));
        assert_eq!(registry.dispatch(&mut seen, "echo\n"), Outcome::success(""));
        assert_eq!(registry.dispatch(&mut seen, "echo"), Outcome::success(""));
        assert_eq!(seen, vec!["hi there", "", ""]);
    }

    #[test]
    fn test_dispatch_unknown_command() {
        let registry = registry();
        let mut seen = Vec::new();

        assert_eq!(registry.dispatch(&mut seen, "frobnicate\n"), Outcome::Failure);
        assert_eq!(registry.dispatch(&mut seen, "\n"), Outcome::Failure);
        assert_eq!(registry.dispatch(&mut seen, "ECHO x\n"), Outcome::Failure);
        assert!(seen.is_empty());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = registry();
        let err = registry.register("echo", Echo).unwrap_err();
        assert!(matches!(err, ProtocolError::DuplicateCommand(ref name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_chains() {
        let mut registry = CommandRegistry::new();
        registry
            .register("b", Echo)
            .unwrap()
            .register("a", Echo)
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }
}
