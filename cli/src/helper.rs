use crate::CLIError;
use bluetooth_mesh_stack::address::{Address, UnicastAddress};
use bluetooth_mesh_stack::directory::MeshNetwork;
use std::fmt::{Error, Formatter};
use std::str::FromStr;

pub struct HexSlice<'a>(pub &'a [u8]);
impl<'a> std::fmt::UpperHex for HexSlice<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        for &b in self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl<'a> std::fmt::LowerHex for HexSlice<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        for &b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
pub fn is_hex_str(s: &str) -> bool {
    s.len() % 2 == 0 && s.chars().all(|c| c.is_digit(16))
}
pub fn is_hex_str_validator(input: String) -> Result<(), String> {
    if is_hex_str(&input) {
        Ok(())
    } else {
        Err(format!("'{}' is not a hex string", &input))
    }
}
pub fn is_128_bit_hex_str_validator(input: String) -> Result<(), String> {
    if input.len() == 32 && is_hex_str(&input) {
        Ok(())
    } else {
        Err(format!("'{}' is not a 128-bit hex string", &input))
    }
}
pub fn is_u16_validator(input: String) -> Result<(), String> {
    match u16::from_str(&input) {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("'{}' is not a 16-bit unsigned integer", &input)),
    }
}
/// Decimal or `0x` prefixed hex.
pub fn parse_u16(input: &str) -> Option<u16> {
    if let Some(hex) = input.strip_prefix("0x") {
        u16::from_str_radix(hex, 16).ok()
    } else {
        u16::from_str(input).ok()
    }
}
pub fn parse_address(input: &str) -> Option<Address> {
    parse_u16(input).map(Address::from)
}
pub fn parse_unicast(input: &str) -> Option<UnicastAddress> {
    parse_address(input)?.unicast()
}
pub fn is_address_validator(input: String) -> Result<(), String> {
    match parse_address(&input) {
        Some(address) if address.is_assigned() => Ok(()),
        _ => Err(format!("'{}' is not an assigned mesh address", &input)),
    }
}
pub fn is_unicast_validator(input: String) -> Result<(), String> {
    match parse_unicast(&input) {
        Some(_) => Ok(()),
        None => Err(format!("'{}' is not a unicast address", &input)),
    }
}
pub fn hex_str_to_bytes<T: Default + AsMut<[u8]>>(s: &str) -> Option<T> {
    let mut out = T::default();
    let buf = out.as_mut();
    if s.len() != buf.len() * 2 || buf.is_empty() {
        return None;
    }
    buf.copy_from_slice(&hex_str_to_vec(s)?);
    Some(out)
}
pub fn hex_str_to_vec(s: &str) -> Option<Vec<u8>> {
    if !is_hex_str(s) {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}
pub fn load_file(path: &str, writeable: bool, create: bool) -> Result<std::fs::File, CLIError> {
    std::fs::OpenOptions::new()
        .read(true)
        .write(writeable)
        .truncate(writeable)
        .create(create)
        .open(path)
        .map_err(|e| CLIError::IOError(path.to_owned(), e))
}
pub fn load_network(path: &str) -> Result<MeshNetwork, CLIError> {
    serde_json::from_reader(load_file(path, false, false)?).map_err(CLIError::SerdeJSON)
}
pub fn write_network(path: &str, network: &MeshNetwork) -> Result<(), CLIError> {
    serde_json::to_writer_pretty(load_file(path, true, true)?, network)
        .map_err(CLIError::SerdeJSON)
}
pub fn device_state_arg() -> clap::Arg<'static, 'static> {
    clap::Arg::with_name("device_state")
        .short("d")
        .long("device_state")
        .value_name("FILE")
        .required(true)
        .help("Specifies device state .json file")
}
/// Reads a required argument that clap already validated.
pub fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> Result<&'a str, CLIError> {
    matches.value_of(name).ok_or_else(|| {
        CLIError::Clap(clap::Error::with_description(
            &format!("missing argument '{}'", name),
            clap::ErrorKind::ArgumentNotFound,
        ))
    })
}
pub fn invalid_value(message: String) -> CLIError {
    CLIError::Clap(clap::Error::with_description(
        &message,
        clap::ErrorKind::InvalidValue,
    ))
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex_str_to_vec("00ff10"), Some(vec![0x00, 0xFF, 0x10]));
        assert_eq!(hex_str_to_vec("abc"), None);
        assert_eq!(hex_str_to_bytes::<[u8; 2]>("0102"), Some([1, 2]));
        assert_eq!(format!("{:x}", HexSlice(&[0x0A, 0xB0])), "0ab0");
    }
    #[test]
    fn test_addresses() {
        assert_eq!(parse_u16("0x0010"), Some(16));
        assert_eq!(parse_u16("16"), Some(16));
        assert!(parse_unicast("0xC000").is_none());
        assert_eq!(parse_unicast("1"), Some(UnicastAddress::new(1)));
    }
}
