use slog::Drain;
#[macro_use]
extern crate slog;

use bluetooth_mesh_stack::stack::SendError;
use std::convert::TryFrom;

pub mod commands;
pub mod helper;
pub enum CLIError {
    IOError(String, std::io::Error),
    Clap(clap::Error),
    SerdeJSON(serde_json::Error),
    OtherMessage(String),
    Send(SendError),
}
impl From<SendError> for CLIError {
    fn from(e: SendError) -> Self {
        CLIError::Send(e)
    }
}

fn main() {
    let app = clap::App::new("Bluetooth Mesh CLI")
        .version(clap::crate_version!())
        .author("Andrew Gilbrough <andrew@gilbrough.com>")
        .about("Bluetooth Mesh Command Line Interface tool to build and decode mesh messages")
        .arg(
            clap::Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .max_values(3)
                .help("Set the amount of logging (-v info, -vv debug, -vvv trace)"),
        )
        .subcommand(commands::state::sub_command())
        .subcommand(commands::crypto::sub_command())
        .subcommand(commands::send::sub_command())
        .subcommand(commands::receive::sub_command());
    let matches = app.get_matches();

    let verbosity = usize::try_from(matches.occurrences_of("verbose")).unwrap_or(usize::MAX);
    let log_level =
        slog::Level::from_usize(3_usize.saturating_add(verbosity)).unwrap_or(slog::Level::Trace);
    let decorator = slog_term::PlainSyncDecorator::new(std::io::stderr());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let root = slog::Logger::root(slog::LevelFilter::new(drain, log_level).fuse(), slog::o!());
    trace!(root, "main");
    let sub_cmd = matches.subcommand().0;
    debug!(root, "arg_match"; "sub_command" => sub_cmd);
    if let Err(e) = (|| -> Result<(), CLIError> {
        match matches.subcommand() {
            ("", None) => error!(root, "no command given"),
            ("state", Some(state_matches)) => commands::state::state_matches(&root, state_matches)?,
            ("crypto", Some(crypto_matches)) => {
                commands::crypto::crypto_matches(&root, crypto_matches)?
            }
            ("send", Some(send_matches)) => commands::send::send_matches(&root, send_matches)?,
            ("receive", Some(receive_matches)) => {
                commands::receive::receive_matches(&root, receive_matches)?
            }
            _ => unreachable!("unhandled sub_command"),
        }
        debug!(root, "matches_done");
        Ok(())
    })() {
        match e {
            CLIError::IOError(path, error) => {
                eprintln!("io error {:?} with path '{}'", error, path)
            }
            CLIError::Clap(error) => eprintln!("{}", &error.message),
            CLIError::SerdeJSON(error) => eprintln!("json error {}", error),
            CLIError::OtherMessage(msg) => eprintln!("error: {}", &msg),
            CLIError::Send(error) => eprintln!("send error: {}", error),
        };
        std::process::exit(1);
    }
}
