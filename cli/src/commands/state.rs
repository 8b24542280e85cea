use crate::{helper, CLIError};
use bluetooth_mesh_stack::address::UnicastAddress;
use bluetooth_mesh_stack::crypto::key::{AppKey, DevKey, NetKey};
use bluetooth_mesh_stack::directory::{MeshNetwork, NodeDirectory, ProvisionedNode};
use bluetooth_mesh_stack::mesh::{AppKeyIndex, IVIndex, NetKeyIndex};
use bluetooth_mesh_stack::random::Randomizable;

fn element_count_arg() -> clap::Arg<'static, 'static> {
    clap::Arg::with_name("element_count")
        .short("c")
        .long("element_count")
        .value_name("ELEMENT_COUNT")
        .default_value("1")
        .validator(|count| match count.parse::<u8>() {
            Ok(1..=0xFF) => Ok(()),
            _ => Err(format!(
                "Invalid element count '{}'. Expected in range [1..0xFF]",
                count
            )),
        })
}
fn address_arg() -> clap::Arg<'static, 'static> {
    clap::Arg::with_name("address")
        .short("a")
        .long("address")
        .value_name("UNICAST_ADDRESS")
        .required(true)
        .validator(helper::is_unicast_validator)
}
pub fn sub_command() -> clap::App<'static, 'static> {
    clap::SubCommand::with_name("state")
        .about("Create and edit device state files")
        .subcommand(
            clap::SubCommand::with_name("new")
                .about("Generate a device state with random keys (netkey 0, appkey 0)")
                .arg(helper::device_state_arg())
                .arg(address_arg())
                .arg(element_count_arg()),
        )
        .subcommand(
            clap::SubCommand::with_name("add-node")
                .about("Add a peer node to the device state")
                .arg(helper::device_state_arg())
                .arg(address_arg())
                .arg(element_count_arg())
                .arg(
                    clap::Arg::with_name("dev_key")
                        .long("dev-key")
                        .value_name("KEY_HEX")
                        .required(true)
                        .validator(helper::is_128_bit_hex_str_validator),
                ),
        )
        .subcommand(
            clap::SubCommand::with_name("show")
                .about("Print the local node and every known peer")
                .arg(helper::device_state_arg()),
        )
}
fn element_count(matches: &clap::ArgMatches) -> Result<u8, CLIError> {
    let count = helper::required(matches, "element_count")?;
    count
        .parse()
        .map_err(|_| helper::invalid_value(format!("bad element count '{}'", count)))
}
fn unicast(matches: &clap::ArgMatches) -> Result<UnicastAddress, CLIError> {
    let address = helper::required(matches, "address")?;
    helper::parse_unicast(address)
        .ok_or_else(|| helper::invalid_value(format!("'{}' is not a unicast address", address)))
}
fn print_network(network: &MeshNetwork) {
    let provisioner = network.provisioner();
    println!(
        "local: 0x{:04x} elements: {} seq: {} iv_index: {}",
        provisioner.unicast_address().value(),
        provisioner.element_count(),
        provisioner.sequence_number().value(),
        network.iv_index().0
    );
    for keys in network.network_keys().iter() {
        println!(
            "net_index: {} nid: 0x{:02x} key: {:x}",
            keys.net_key_index().0,
            keys.network_keys().nid().value(),
            keys.net_key().key()
        );
    }
    for keys in network.network_keys().iter() {
        for app in network.application_keys(keys.net_key_index()) {
            println!(
                "app_index: {} net_index: {} aid: 0x{:02x} key: {:x}",
                app.app_key_index.0,
                app.net_key_index.0,
                app.aid.value(),
                app.app_key.key()
            );
        }
    }
    for node in network.nodes() {
        println!(
            "node: 0x{:04x} elements: {} seq: {} default_ttl: {}",
            node.unicast_address().value(),
            node.element_count(),
            node.sequence_number().value(),
            node.default_ttl().value()
        );
    }
}
pub fn state_matches(
    parent_logger: &slog::Logger,
    state_matches: &clap::ArgMatches,
) -> Result<(), CLIError> {
    let logger = parent_logger.new(o!("command" => "state"));
    match state_matches.subcommand() {
        ("new", Some(new_matches)) => {
            let path = helper::required(new_matches, "device_state")?;
            let provisioner = ProvisionedNode::new(
                unicast(new_matches)?,
                element_count(new_matches)?,
                DevKey::random_secure(),
            );
            let mut network =
                MeshNetwork::new(provisioner, NetKey::random_secure(), IVIndex(0));
            network.add_app_key(AppKeyIndex(0), AppKey::random_secure(), NetKeyIndex(0));
            helper::write_network(path, &network)?;
            info!(logger, "generated device state"; "path" => path);
            print_network(&network);
        }
        ("add-node", Some(add_matches)) => {
            let path = helper::required(add_matches, "device_state")?;
            let dev_key_hex = helper::required(add_matches, "dev_key")?;
            let dev_key = DevKey::from_hex(dev_key_hex).ok_or_else(|| {
                helper::invalid_value(format!("bad device key '{}'", dev_key_hex))
            })?;
            let address = unicast(add_matches)?;
            let mut network = helper::load_network(path)?;
            if network.is_local(address) {
                return Err(helper::invalid_value(format!(
                    "0x{:04x} belongs to the local node",
                    address.value()
                )));
            }
            let node = ProvisionedNode::new(address, element_count(add_matches)?, dev_key);
            if network.add_node(node).is_some() {
                warn!(logger, "replaced existing node"; "address" => address.value());
            }
            helper::write_network(path, &network)?;
            info!(logger, "added node"; "address" => address.value());
        }
        ("show", Some(show_matches)) => {
            let path = helper::required(show_matches, "device_state")?;
            print_network(&helper::load_network(path)?);
        }
        ("", None) => error!(logger, "no_state_subcommand"),
        _ => unreachable!("unhandled state subcommand"),
    }
    Ok(())
}
