//! Manual test driver for a running façade.
//!
//! Every step prints what it does and what came back. A failed step is reported and ends
//! the probe; nothing here panics on a bad server answer.

mod client;
mod render;
mod sessions;

use clap::Args;
use wayfarer_http::apis::adk::RunRequest;
use wayfarer_http::Content;

use client::{pretty, ProbeClient};
use render::render_events;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_APP: &str = "agents";
pub const DEFAULT_USER: &str = "test-user";

pub const SIMPLE_QUERY: &str = "I want to plan a trip to Paris for 5 days in December.";
pub const COMPLEX_QUERY: &str = "I want to plan a family trip to Japan for 10 days in April. \
    We're interested in experiencing cherry blossom season, visiting historical sites, \
    and trying authentic Japanese cuisine. We'd like to visit Tokyo, Kyoto, and possibly one other city. \
    Our budget is medium, and we prefer a mix of hotel and traditional ryokan accommodations. \
    Please suggest an itinerary.";

pub const EXAMPLES: &str = "\
Default behavior:
  Reuses the first listed session (creating one when there is none) and runs the
  simple trip planning query (5-day Paris trip).

Examples:
  wayfarer probe --question \"What are good places to visit in Rome?\"
  wayfarer probe --fresh --question \"What should I pack for a beach vacation?\"
  wayfarer probe --session abc123 --question \"Is Tokyo expensive to visit?\"
  wayfarer probe --complex --fresh
  wayfarer probe --list-sessions";

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Run the complex trip planning query (10-day Japan trip with cherry blossoms)
    #[arg(long)]
    pub complex: bool,

    /// Use a specific session ID
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,

    /// Create a fresh session and test with it
    #[arg(long, conflicts_with = "no_fresh")]
    pub fresh: bool,

    /// Reuse an existing session (default)
    #[arg(long)]
    pub no_fresh: bool,

    /// Custom question to ask the agent
    #[arg(long, value_name = "TEXT")]
    pub question: Option<String>,

    /// List all active sessions for the user and exit
    #[arg(long)]
    pub list_sessions: bool,

    /// Façade base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value = DEFAULT_APP)]
    pub app: String,

    #[arg(long, default_value = DEFAULT_USER)]
    pub user: String,

    /// Ask the server to drop Content-Encoding on the /run response (noCompress=true)
    #[arg(long)]
    pub no_compress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Explicit(String),
    Fresh,
    Reuse,
}

impl ProbeArgs {
    /// `--session` wins over `--fresh`, which wins over reusing a listed session
    pub fn session_mode(&self) -> SessionMode {
        match (&self.session, self.fresh) {
            (Some(id), _) => SessionMode::Explicit(id.clone()),
            (None, true) => SessionMode::Fresh,
            (None, false) => SessionMode::Reuse,
        }
    }

    pub fn query(&self) -> &str {
        match &self.question {
            Some(question) => question.as_str(),
            None if self.complex => COMPLEX_QUERY,
            None => SIMPLE_QUERY,
        }
    }
}

/// Returns whether the probe completed; setup and call failures are printed, not raised
pub async fn run(args: ProbeArgs) -> anyhow::Result<bool> {
    println!("Trip Planner Agent API Test");
    println!("==========================");

    let client = ProbeClient::new(&args.base_url, &args.app, &args.user)?;

    if args.list_sessions {
        return Ok(sessions::list_sessions(&client).await);
    }

    let session_id = match args.session_mode() {
        SessionMode::Explicit(id) => sessions::use_manual_session(&client, &id).await,
        SessionMode::Fresh => match sessions::create_fresh_session(&client).await {
            Ok(id) => id,
            Err(e) => {
                println!("Failed to create fresh session: {}", e);
                return Ok(false);
            }
        },
        SessionMode::Reuse => match sessions::create_session(&client).await {
            Ok(id) => {
                if !sessions::check_session_exists(&client, &id).await {
                    println!(
                        "ERROR: Session {} could not be verified. Cannot proceed with test.",
                        id
                    );
                    return Ok(false);
                }
                println!("Session {} verified. Proceeding with API request.", id);
                id
            }
            Err(e) => {
                println!("Failed to setup session: {}", e);
                return Ok(false);
            }
        },
    };

    Ok(run_query(&client, &session_id, args.query(), args.complex, args.no_compress).await)
}

pub async fn run_query(
    client: &ProbeClient,
    session_id: &str,
    query: &str,
    complex: bool,
    no_compress: bool,
) -> bool {
    println!("Query: {}", query);

    let request = RunRequest::new(&client.app, &client.user, session_id, Content::user_text(query));
    let kind = if complex { "complex request" } else { "request" };
    println!("Sending {} to {}:", kind, client.run_url(no_compress));
    match serde_json::to_value(&request) {
        Ok(payload) => println!("{}", pretty(&payload)),
        Err(e) => println!("(payload not printable: {})", e),
    }
    println!("\n{}\n", "-".repeat(50));

    match client.run(&request, no_compress).await {
        Ok((status, events)) => {
            println!("Response status code: {}", status.as_u16());
            print!("{}", render_events(&events, complex));
            true
        }
        Err(e) => {
            println!("HTTP Error: {}", e);
            e.report();
            false
        }
    }
}
