use std::io::{self, Write};

use streaming_chat::config::EnvConfig;
use streaming_chat::ChatSession;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> streaming_chat::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = EnvConfig::from_env()?;
    let session = ChatSession::new(config.provider.build_client()?, config.session);

    println!("Chat initialized. Press Enter on an empty line or type 'exit' to quit.");

    loop {
        print!("User: ");
        io::stdout().flush()?;

        let mut user_input = String::new();
        if io::stdin().read_line(&mut user_input)? == 0 {
            break;
        }

        let user_input = user_input.trim_end_matches(['\r', '\n']);
        if user_input.is_empty() || user_input == "exit" {
            break;
        }

        print!("\nAssistant: ");
        io::stdout().flush()?;

        let mut printer = FragmentPrinter::new(io::stdout());
        let result = session
            .send_with_observer(user_input, |fragment| printer.print(fragment))
            .await;
        let streamed = printer.finish()?;

        match result {
            // the finish-reason note is only part of the final text
            Ok(response) => match response.strip_prefix(streamed.as_str()) {
                Some(note) => println!("{note}\n"),
                None => println!("\n"),
            },
            Err(err) => eprintln!("\nError: {err}\n"),
        }
    }

    println!("Bye!");
    Ok(())
}

/// Echoes streamed fragments, keeping the first write error for after the turn.
struct FragmentPrinter<W> {
    out: W,
    streamed: String,
    error: Option<io::Error>,
}

impl<W: Write> FragmentPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            streamed: String::new(),
            error: None,
        }
    }

    fn print(&mut self, fragment: &str) {
        self.streamed.push_str(fragment);
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self
            .out
            .write_all(fragment.as_bytes())
            .and_then(|()| self.out.flush())
        {
            self.error = Some(err);
        }
    }

    /// Everything that was streamed, or the first error writing it out.
    fn finish(self) -> io::Result<String> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.streamed),
        }
    }
}
