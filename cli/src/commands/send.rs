use crate::helper::HexSlice;
use crate::{helper, CLIError};
use bluetooth_mesh_stack::access::Opcode;
use bluetooth_mesh_stack::crypto::aes::MicSize;
use bluetooth_mesh_stack::mesh::{AppKeyIndex, TTL};
use bluetooth_mesh_stack::stack::bearer::RecordingBearer;
use bluetooth_mesh_stack::stack::dispatcher::MeshDispatcher;
use bluetooth_mesh_stack::stack::messages::{MessageKind, OutgoingMessage};
use bluetooth_mesh_stack::stack::StackConfig;
use std::time::Instant;

pub fn sub_command() -> clap::App<'static, 'static> {
    clap::SubCommand::with_name("send")
        .about("Build the network frames of an access message and print them as hex")
        .arg(helper::device_state_arg())
        .arg(
            clap::Arg::with_name("dst")
                .long("dst")
                .value_name("ADDRESS")
                .required_unless("proxy")
                .validator(helper::is_address_validator),
        )
        .arg(
            clap::Arg::with_name("opcode")
                .long("opcode")
                .value_name("OPCODE_HEX")
                .help("1, 2 or 3 (vendor, with little endian company ID) octet opcode")
                .required(true)
                .validator(helper::is_hex_str_validator),
        )
        .arg(
            clap::Arg::with_name("params")
                .long("params")
                .value_name("PARAMS_HEX")
                .validator(helper::is_hex_str_validator),
        )
        .arg(
            clap::Arg::with_name("app_index")
                .long("app-index")
                .value_name("APP_KEY_INDEX")
                .help("Defaults to 0")
                .validator(helper::is_u16_validator),
        )
        .arg(
            clap::Arg::with_name("config")
                .long("config")
                .help("Secure with the destination's device key")
                .conflicts_with_all(&["app_index", "proxy"]),
        )
        .arg(
            clap::Arg::with_name("proxy")
                .long("proxy")
                .help("Proxy configuration message to the connected proxy")
                .conflicts_with_all(&["app_index", "config", "dst"]),
        )
        .arg(
            clap::Arg::with_name("unacked")
                .long("unacked")
                .help("Vendor opcodes only. Don't expect a status in response"),
        )
        .arg(
            clap::Arg::with_name("ttl")
                .long("ttl")
                .value_name("TTL")
                .validator(|ttl| match ttl.parse::<u8>() {
                    Ok(0..=127) => Ok(()),
                    _ => Err(format!("Invalid TTL '{}'. Expected in range [0..127]", ttl)),
                }),
        )
        .arg(
            clap::Arg::with_name("big_mic")
                .long("big-mic")
                .help("Use a 64 bit TransMIC if the message gets segmented"),
        )
        .arg(
            clap::Arg::with_name("force_segment")
                .long("force-segment")
                .help("Segment even if the message fits in one PDU"),
        )
}
fn parse_opcode(opcode_hex: &str) -> Result<Opcode, CLIError> {
    let bytes = helper::hex_str_to_vec(opcode_hex)
        .ok_or_else(|| helper::invalid_value(format!("'{}' isn't hex", opcode_hex)))?;
    match Opcode::unpack_from(&bytes) {
        Ok(opcode) if opcode.byte_len() == bytes.len() => Ok(opcode),
        _ => Err(helper::invalid_value(format!(
            "'{}' isn't a valid opcode",
            opcode_hex
        ))),
    }
}
fn outgoing_message(matches: &clap::ArgMatches) -> Result<OutgoingMessage, CLIError> {
    let opcode = parse_opcode(helper::required(matches, "opcode")?)?;
    let params_hex = matches.value_of("params").unwrap_or("");
    let parameters = helper::hex_str_to_vec(params_hex)
        .ok_or_else(|| helper::invalid_value(format!("'{}' isn't hex", params_hex)))?;
    if matches.is_present("proxy") {
        return Ok(OutgoingMessage::proxy_config(opcode, parameters));
    }
    let dst_str = helper::required(matches, "dst")?;
    let dst = helper::parse_address(dst_str)
        .ok_or_else(|| helper::invalid_value(format!("bad destination '{}'", dst_str)))?;
    let mut message = if matches.is_present("config") {
        let unicast = dst.unicast().ok_or_else(|| {
            helper::invalid_value(format!("config messages need a unicast dst, not '{}'", dst_str))
        })?;
        OutgoingMessage::config(unicast, opcode, parameters)
    } else {
        let app_key_index = AppKeyIndex(
            helper::parse_u16(matches.value_of("app_index").unwrap_or("0"))
                .ok_or_else(|| helper::invalid_value("bad app key index".to_owned()))?,
        );
        if opcode.is_vendor() {
            let acknowledged = !matches.is_present("unacked");
            OutgoingMessage::vendor(dst, app_key_index, opcode, parameters, acknowledged)
        } else {
            OutgoingMessage::new(
                MessageKind::Generic { app_key_index },
                dst,
                opcode,
                parameters,
            )
        }
    };
    if let Some(ttl) = matches.value_of("ttl") {
        let ttl = ttl
            .parse::<u8>()
            .ok()
            .filter(|&ttl| ttl <= 127)
            .ok_or_else(|| helper::invalid_value(format!("bad ttl '{}'", ttl)))?;
        message = message.with_ttl(TTL::new(ttl));
    }
    if matches.is_present("big_mic") {
        message = message.with_mic_size(MicSize::Big);
    }
    Ok(message.with_force_segment(matches.is_present("force_segment")))
}
pub fn send_matches(
    parent_logger: &slog::Logger,
    send_matches: &clap::ArgMatches,
) -> Result<(), CLIError> {
    let logger = parent_logger.new(o!("command" => "send"));
    let path = helper::required(send_matches, "device_state")?;
    let message = outgoing_message(send_matches)?;
    debug!(logger, "outgoing_message"; "dst" => message.dst.value(), "opcode" => %message.opcode,
        "kind" => ?message.kind);
    let network = helper::load_network(path)?;
    let mut dispatcher =
        MeshDispatcher::new(network, RecordingBearer::new(), StackConfig::default())
            .with_logger(logger.new(o!("layer" => "dispatcher")));
    dispatcher.send(&message, Instant::now())?;
    for frame in dispatcher.bearer().frames() {
        println!("{:x}", HexSlice(&frame.frame));
    }
    for event in dispatcher.drain_events() {
        debug!(logger, "status_event"; "event" => ?event);
    }
    // The next sequence number has to survive for the following send.
    helper::write_network(path, &dispatcher.into_directory())?;
    info!(logger, "device state updated"; "path" => path);
    Ok(())
}
