//! Serial port discovery.

use std::io;
use std::path::{Path, PathBuf};

/// Device-name prefixes of USB serial adapters and CDC-ACM radios.
const PORT_PREFIXES: &[&str] = &["ttyUSB", "ttyACM", "cu.usb", "tty.usb"];

/// Candidate serial ports under `/dev`, sorted by path.
pub fn list_serial_ports() -> io::Result<Vec<PathBuf>> {
    list_serial_ports_in(Path::new("/dev"))
}

/// Candidate serial ports under `dir`, sorted by path.
pub fn list_serial_ports_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut ports: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(is_serial_port_name)
        })
        .map(|entry| entry.path())
        .collect();
    ports.sort();
    Ok(ports)
}

pub fn is_serial_port_name(name: &str) -> bool {
    PORT_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}
