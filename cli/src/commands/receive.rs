use crate::helper::HexSlice;
use crate::{helper, CLIError};
use bluetooth_mesh_stack::mesh::CompanyID;
use bluetooth_mesh_stack::stack::bearer::RecordingBearer;
use bluetooth_mesh_stack::stack::dispatcher::MeshDispatcher;
use bluetooth_mesh_stack::stack::state::StateKind;
use bluetooth_mesh_stack::stack::StackConfig;
use std::time::Instant;

pub fn sub_command() -> clap::App<'static, 'static> {
    clap::SubCommand::with_name("receive")
        .about("Feed network frames (pdu type octet first) through the stack and print the events")
        .arg(helper::device_state_arg())
        .arg(
            clap::Arg::with_name("frames")
                .value_name("FRAME_HEX")
                .required(true)
                .multiple(true)
                .validator(helper::is_hex_str_validator),
        )
        .arg(
            clap::Arg::with_name("expect")
                .long("expect")
                .value_name("KIND")
                .help("Parse statuses from --from as responses to this kind of request")
                .possible_values(&["config", "generic", "vendor"])
                .requires("from"),
        )
        .arg(
            clap::Arg::with_name("from")
                .long("from")
                .value_name("ADDRESS")
                .validator(helper::is_unicast_validator),
        )
        .arg(
            clap::Arg::with_name("cid")
                .long("cid")
                .value_name("COMPANY_ID")
                .help("Company ID of vendor statuses")
                .default_value("0"),
        )
}
fn expected_kind(matches: &clap::ArgMatches) -> Result<Option<StateKind>, CLIError> {
    let kind = match matches.value_of("expect") {
        None => return Ok(None),
        Some("config") => StateKind::Config,
        Some("generic") => StateKind::Generic,
        Some("vendor") => {
            let cid = helper::required(matches, "cid")?;
            let cid = helper::parse_u16(cid)
                .ok_or_else(|| helper::invalid_value(format!("bad company id '{}'", cid)))?;
            StateKind::VendorModelAcked(CompanyID(cid))
        }
        Some(other) => {
            return Err(CLIError::OtherMessage(format!(
                "unknown status kind '{}'",
                other
            )))
        }
    };
    Ok(Some(kind))
}
pub fn receive_matches(
    parent_logger: &slog::Logger,
    receive_matches: &clap::ArgMatches,
) -> Result<(), CLIError> {
    let logger = parent_logger.new(o!("command" => "receive"));
    let path = helper::required(receive_matches, "device_state")?;
    let frames = receive_matches
        .values_of("frames")
        .into_iter()
        .flatten()
        .map(|hex| {
            helper::hex_str_to_vec(hex)
                .ok_or_else(|| helper::invalid_value(format!("'{}' isn't hex", hex)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let network = helper::load_network(path)?;
    let mut dispatcher =
        MeshDispatcher::new(network, RecordingBearer::new(), StackConfig::default())
            .with_logger(logger.new(o!("layer" => "dispatcher")));
    if let Some(kind) = expected_kind(receive_matches)? {
        let from = helper::required(receive_matches, "from")?;
        let from = helper::parse_address(from)
            .ok_or_else(|| helper::invalid_value(format!("bad address '{}'", from)))?;
        dispatcher.expect_responses(from, kind);
    }
    for (i, frame) in frames.iter().enumerate() {
        if let Err(e) = dispatcher.receive(frame, Instant::now()) {
            warn!(logger, "frame_dropped"; "index" => i, "reason" => %e);
        }
        for event in dispatcher.drain_events() {
            println!("{:?}", event);
        }
    }
    // Block acks (and anything else the stack answered with).
    for frame in dispatcher.bearer_mut().take_frames() {
        println!("sent: {:x}", HexSlice(&frame.frame));
    }
    helper::write_network(path, &dispatcher.into_directory())?;
    info!(logger, "device state updated"; "path" => path);
    Ok(())
}
