use std::fmt;
use std::io::{self, IsTerminal};

use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

/// Writes diagnostics to stderr; session errors read `[error]: <protocol>: <cause>`.
pub struct SonarFormatter;

impl<S, N> FormatEvent<S, N> for SonarFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) =
            match *event.metadata().level() {
                Level::TRACE => ("[ ]", |s| s.dimmed()),
                Level::DEBUG => ("[?]", |s| s.blue()),
                Level::INFO => ("[+]", |s| s.green().bold()),
                Level::WARN => ("[*]", |s| s.yellow().bold()),
                Level::ERROR => ("[error]:", |s| s.red().bold()),
            };

        writeln!(writer, "{} {}", color_func(symbol.into()), fields.body())
    }
}

#[derive(Default)]
struct EventFields {
    protocol: Option<String>,
    message: String,
    extra: Vec<(String, String)>,
}

impl EventFields {
    fn push(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            "protocol" => self.protocol = Some(value),
            name => self.extra.push((name.to_string(), value)),
        }
    }

    fn body(&self) -> String {
        let mut body = match &self.protocol {
            Some(protocol) => format!("{protocol}: {}", self.message),
            None => self.message.clone(),
        };
        for (name, value) in &self.extra {
            body.push_str(&format!(" {name}={value}"));
        }
        body
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

pub fn init_logging(verbosity: u8) {
    if !io::stderr().is_terminal() {
        colored::control::set_override(false);
    }

    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .event_format(SonarFormatter)
        .init();
}
