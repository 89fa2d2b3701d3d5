//! Interactive line-based prompt.

use std::io::{self, BufRead, Write};

use runtime::{Backend, Reply, Session, ToolProvider};
use serde::Deserialize;
use tracing::{debug, warn};

/// Input that ends the prompt loop (case-insensitive).
pub const SENTINEL: &str = "quit";

/// A reply the model formatted as a link to open, e.g. directions from a
/// navigation tool: `{"url": "...", "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Navigation {
    pub url: String,
    #[serde(default)]
    pub text: String,
}

impl Navigation {
    /// Recognize a navigation reply. Only `http` and `https` links count.
    pub fn parse(reply: &str) -> Option<Self> {
        let reply = reply.trim();
        if !reply.starts_with('{') {
            return None;
        }
        serde_json::from_str::<Self>(reply)
            .ok()
            .filter(|nav| nav.url.starts_with("https://") || nav.url.starts_with("http://"))
    }
}

/// Where navigation links go.
pub trait LinkOpener {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens links in the system's default browser.
pub struct Browser;

impl LinkOpener for Browser {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

/// Leaves links printed but unopened.
pub struct PrintOnly;

impl LinkOpener for PrintOnly {
    fn open(&self, url: &str) -> io::Result<()> {
        debug!(url, "not opening link");
        Ok(())
    }
}

/// Read queries from `input` until the sentinel or EOF, running one turn per
/// line. A failed turn is reported and the loop keeps going.
pub async fn run<B, P, R, W>(
    session: &mut Session<B, P>,
    mut input: R,
    output: &mut W,
    opener: &dyn LinkOpener,
) -> io::Result<()>
where
    B: Backend,
    P: ToolProvider,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Type your queries or '{SENTINEL}' to exit.")?;

    let mut buf = Vec::new();
    loop {
        write!(output, "\nQuery: ")?;
        output.flush()?;

        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            // EOF
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "skipping undecodable input line");
                writeln!(output, "\nError: input is not valid UTF-8")?;
                continue;
            }
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case(SENTINEL) {
            break;
        }

        match session.chat(query).await {
            Ok(reply) => {
                writeln!(output, "\n{}", render(&reply))?;
                if let Some(nav) = Navigation::parse(&reply.text) {
                    if let Err(e) = opener.open(&nav.url) {
                        writeln!(output, "Error: could not open {}: {e}", nav.url)?;
                    }
                }
            }
            Err(e) => writeln!(output, "\nError: {e}")?,
        }
    }

    Ok(())
}

/// Format a reply, noting the tool call when one was made.
///
/// Navigation replies show their text with the link on the next line.
pub fn render(reply: &Reply) -> String {
    let body = match Navigation::parse(&reply.text) {
        Some(nav) if nav.text.is_empty() => nav.url,
        Some(nav) => format!("{}\n{}", nav.text, nav.url),
        None => reply.text.clone(),
    };
    match &reply.tool_call {
        Some(call) => format!(
            "[Calling tool {} with args {}]\n{body}",
            call.request.tool_name, call.request.arguments
        ),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::testing::{ScriptedBackend, StaticProvider};
    use runtime::{Content, ModelConfig, ToolRegistry};
    use serde_json::json;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl LinkOpener for Recorder {
        fn open(&self, url: &str) -> io::Result<()> {
            self.0.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    struct Broken;

    impl LinkOpener for Broken {
        fn open(&self, _url: &str) -> io::Result<()> {
            Err(io::Error::other("no browser"))
        }
    }

    async fn session(
        backend: ScriptedBackend,
        provider: StaticProvider,
    ) -> Session<ScriptedBackend, StaticProvider> {
        let mut session = Session::new(
            backend,
            ToolRegistry::new(vec![provider]),
            ModelConfig::default(),
        );
        session.discover().await.unwrap();
        session
    }

    fn provider() -> StaticProvider {
        StaticProvider::new("weather").with_tool("get_alerts", Content::text("No active alerts."))
    }

    async fn drive_bytes(
        session: &mut Session<ScriptedBackend, StaticProvider>,
        input: &[u8],
        opener: &dyn LinkOpener,
    ) -> String {
        let mut output = Vec::new();
        run(session, Cursor::new(input.to_vec()), &mut output, opener)
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    async fn drive(session: &mut Session<ScriptedBackend, StaticProvider>, input: &str) -> String {
        drive_bytes(session, input.as_bytes(), &PrintOnly).await
    }

    #[tokio::test]
    async fn quit_exits_without_model_or_tool_calls() {
        let backend = ScriptedBackend::new().answer("never sent");
        let requests = backend.requests();
        let provider = provider();
        let (calls, closed) = (provider.calls(), provider.closed());
        let mut session = session(backend, provider).await;

        drive(&mut session, "QUIT\nWhat's the weather?\n").await;
        session.close().await;

        assert!(requests.lock().unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn each_line_is_one_turn() {
        let backend = ScriptedBackend::new()
            .tool_use("get_alerts", json!({"state": "NY"}), None)
            .answer("No alerts in NY.")
            .answer("Bye!");
        let mut session = session(backend, provider()).await;

        let out = drive(&mut session, "Any alerts in NY?\n\n   \nthanks\nquit\n").await;

        assert!(out.contains(r#"[Calling tool get_alerts with args {"state":"NY"}]"#));
        assert!(out.contains("No alerts in NY."));
        assert!(out.contains("Bye!"));
        assert_eq!(session.history().len(), 5);
    }

    #[tokio::test]
    async fn failed_turn_is_reported_and_loop_continues() {
        let backend = ScriptedBackend::new()
            .failure("connection refused")
            .answer("Back online.");
        let mut session = session(backend, provider()).await;

        let out = drive(&mut session, "hello\nhello again\n").await;

        assert!(out.contains("Error: model call failed: network: connection refused"));
        assert!(out.contains("Back online."));
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn undecodable_line_is_reported_and_loop_continues() {
        let backend = ScriptedBackend::new().answer("Hi!");
        let requests = backend.requests();
        let mut session = session(backend, provider()).await;

        let out = drive_bytes(&mut session, b"\xff\xfe bad\nhello\nquit\n", &PrintOnly).await;

        assert!(out.contains("Error: input is not valid UTF-8"));
        assert!(out.contains("Hi!"));
        assert_eq!(requests.lock().unwrap().len(), 1);
        assert_eq!(session.history().messages()[0].text(), "hello");
    }

    #[tokio::test]
    async fn eof_ends_the_loop() {
        let mut session = session(ScriptedBackend::new(), provider()).await;
        let out = drive(&mut session, "").await;
        assert!(out.ends_with("Query: "));
    }

    #[tokio::test]
    async fn last_line_without_newline_is_served() {
        let backend = ScriptedBackend::new().answer("Sure.");
        let mut session = session(backend, provider()).await;

        let out = drive(&mut session, "one more").await;
        assert!(out.contains("Sure."));
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn navigation_reply_opens_link() {
        let reply = r#"{"url": "https://www.google.com/maps/dir/?api=1&destination=51.48,-0.19", "text": "I am now opening the navigation tool for you"}"#;
        let backend = ScriptedBackend::new()
            .answer(reply)
            .answer("Plain answer.");
        let mut session = session(backend, provider()).await;
        let opener = Recorder::default();

        let out = drive_bytes(
            &mut session,
            b"Navigate me to Stamford Bridge\nthanks\n",
            &opener,
        )
        .await;

        assert!(out.contains("I am now opening the navigation tool for you\nhttps://www.google.com/maps/dir/"));
        assert_eq!(
            *opener.0.borrow(),
            ["https://www.google.com/maps/dir/?api=1&destination=51.48,-0.19"]
        );
    }

    #[tokio::test]
    async fn failed_open_is_reported() {
        let backend = ScriptedBackend::new()
            .answer(r#"{"url": "https://maps.example/dir", "text": "Opening."}"#);
        let mut session = session(backend, provider()).await;

        let out = drive_bytes(&mut session, b"directions\n", &Broken).await;
        assert!(out.contains("Error: could not open https://maps.example/dir: no browser"));
    }

    #[test]
    fn navigation_parsing() {
        let nav = Navigation::parse(r#"  {"url": "https://maps.example/dir", "text": "Go"} "#)
            .unwrap();
        assert_eq!(nav.url, "https://maps.example/dir");
        assert_eq!(nav.text, "Go");

        let nav = Navigation::parse(r#"{"url": "http://maps.example"}"#).unwrap();
        assert!(nav.text.is_empty());

        assert!(Navigation::parse("It's sunny in NY.").is_none());
        assert!(Navigation::parse(r#"{"text": "no link"}"#).is_none());
        assert!(Navigation::parse(r#"{"url": "file:///etc/passwd"}"#).is_none());
        assert!(Navigation::parse("{not json").is_none());
    }

    #[test]
    fn render_without_tool_is_just_text() {
        let reply = Reply {
            text: "Hello".into(),
            tool_call: None,
        };
        assert_eq!(render(&reply), "Hello");
    }
}
