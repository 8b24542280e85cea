use crate::{helper, CLIError};
use bluetooth_mesh_stack::crypto::key::{AppKey, NetKey};
use bluetooth_mesh_stack::crypto::materials::NetworkKeys;
use bluetooth_mesh_stack::crypto::NetworkID;

fn key_arg(help: &'static str) -> clap::Arg<'static, 'static> {
    clap::Arg::with_name("key_hex")
        .help(help)
        .required(true)
        .value_name("KEY_HEX")
        .validator(helper::is_128_bit_hex_str_validator)
}
pub fn sub_command() -> clap::App<'static, 'static> {
    clap::SubCommand::with_name("crypto")
        .about("Print values derived from network and application keys")
        .subcommand(
            clap::SubCommand::with_name("k2")
                .about("NID, encryption key and privacy key of a netkey")
                .arg(key_arg("128-bit big endian netkey hex")),
        )
        .subcommand(
            clap::SubCommand::with_name("k3")
                .about("64-bit network ID of a netkey")
                .arg(key_arg("128-bit big endian netkey hex")),
        )
        .subcommand(
            clap::SubCommand::with_name("k4")
                .about("AID of an appkey")
                .arg(key_arg("128-bit big endian appkey hex")),
        )
}
fn parse_key(matches: &clap::ArgMatches) -> Result<[u8; 16], CLIError> {
    let key_hex = helper::required(matches, "key_hex")?;
    helper::hex_str_to_bytes(key_hex)
        .ok_or_else(|| helper::invalid_value(format!("'{}' isn't a 128-bit key", key_hex)))
}
pub fn crypto_matches(
    parent_logger: &slog::Logger,
    crypto_matches: &clap::ArgMatches,
) -> Result<(), CLIError> {
    let logger = parent_logger.new(o!("command" => "crypto"));
    debug!(logger, "crypto_sub_command"; "sub_command" => crypto_matches.subcommand().0);
    match crypto_matches.subcommand() {
        ("k2", Some(k2_matches)) => {
            let keys = NetworkKeys::from(&NetKey::new_bytes(parse_key(k2_matches)?));
            println!("nid: 0x{:02x}", keys.nid().value());
            println!("encryption_key: {:x}", keys.encryption_key().key());
            println!("privacy_key: {:x}", keys.privacy_key().key());
        }
        ("k3", Some(k3_matches)) => {
            let network_id = NetworkID::from(&NetKey::new_bytes(parse_key(k3_matches)?));
            println!("network_id: {:016x}", network_id.0);
        }
        ("k4", Some(k4_matches)) => {
            let aid = AppKey::new_bytes(parse_key(k4_matches)?).aid();
            println!("aid: 0x{:02x}", aid.value());
        }
        ("", None) => error!(logger, "no_crypto_subcommand"),
        _ => unreachable!("unhandled crypto subcommand"),
    }
    Ok(())
}
