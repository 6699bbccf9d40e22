//! File input and output helpers for analysis results.

use std::fs::File;
use std::io::{self, Read, Write};

pub mod json;

/// Reads a file to string.
pub fn read_to_string(path: &str) -> io::Result<String> {
    let mut buffer = String::new();
    File::open(path)?.read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Writes a string to a file, replacing any existing content.
pub fn write_string(path: &str, contents: &str) -> io::Result<()> {
    File::create(path)?.write_all(contents.as_bytes())
}
