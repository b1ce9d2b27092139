//! Terminal input: master password, entry label, entry data.
//!
//! The password is read without echo through `rpassword`. Everything read
//! here is returned in `Zeroizing` containers so the copies outside the
//! wipe registry are cleared on drop.

use std::fs::File;
use std::io::{self, BufRead, IsTerminal, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use zeroize::Zeroizing;

const READ_CHUNK: usize = 4096;

/// Prompt for the master password, twice when `confirm` is set.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read, the password is empty,
/// or the confirmation does not match.
pub fn password(confirm: bool) -> Result<Zeroizing<String>> {
    let first = Zeroizing::new(
        rpassword::prompt_password("[?] Master password: ").context("failed to read password")?,
    );
    if first.is_empty() {
        bail!("empty password not allowed");
    }
    if confirm {
        let second = Zeroizing::new(
            rpassword::prompt_password("[?] Confirm password: ")
                .context("failed to read password")?,
        );
        if *first != *second {
            bail!("passwords do not match");
        }
    }
    Ok(first)
}

/// Use `given` or prompt for a label on standard input.
///
/// # Errors
///
/// Returns an error if standard input cannot be read or the label is empty.
pub fn label(given: Option<String>) -> Result<Zeroizing<String>> {
    if let Some(label) = given {
        return non_empty_label(label);
    }
    eprint!("[?] Label: ");
    read_label(&mut io::stdin().lock())
}

/// Read one line as a label.
///
/// # Errors
///
/// Returns an error on read failure or an empty line.
pub fn read_label<R: BufRead>(reader: &mut R) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader.read_line(&mut line).context("failed to read label")?;
    non_empty_label(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn non_empty_label(label: String) -> Result<Zeroizing<String>> {
    let label = Zeroizing::new(label);
    if label.is_empty() {
        bail!("label must not be empty");
    }
    Ok(label)
}

/// Entry data from `from`, else everything on standard input.
///
/// # Errors
///
/// Returns an error if the file or standard input cannot be read.
pub fn read_data(from: Option<&Path>) -> Result<Zeroizing<Vec<u8>>> {
    if let Some(path) = from {
        let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let size = file
            .metadata()
            .ok()
            .and_then(|meta| usize::try_from(meta.len()).ok())
            .unwrap_or(0);
        return read_sized(&mut file, size).with_context(|| format!("reading {}", path.display()));
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("[?] Enter data, then Ctrl-D:");
    }
    read_all(&mut stdin.lock())
}

/// Read a reader to its end.
///
/// # Errors
///
/// Returns an error on read failure.
pub fn read_all<R: Read>(reader: &mut R) -> Result<Zeroizing<Vec<u8>>> {
    read_sized(reader, 0).context("failed to read data")
}

fn read_sized<R: Read>(reader: &mut R, size_hint: usize) -> io::Result<Zeroizing<Vec<u8>>> {
    let mut data = Zeroizing::new(Vec::with_capacity(size_hint));
    let mut chunk = Zeroizing::new([0u8; READ_CHUNK]);
    loop {
        let n = match reader.read(&mut chunk[..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        append_wiping(&mut data, &chunk[..n]);
    }
    Ok(data)
}

/// Append `bytes` to `data`, growing by copy.
///
/// A plain `Vec` reallocation frees the old block without zeroing it. Here
/// the contents move into a larger `Zeroizing` buffer and the old one is
/// wiped as it drops.
pub fn append_wiping(data: &mut Zeroizing<Vec<u8>>, bytes: &[u8]) {
    let needed = data.len().saturating_add(bytes.len());
    if needed > data.capacity() {
        let capacity = needed.max(data.capacity().saturating_mul(2)).max(READ_CHUNK);
        let mut grown = Zeroizing::new(Vec::with_capacity(capacity));
        grown.extend_from_slice(&data[..]);
        std::mem::swap(data, &mut grown);
    }
    data.extend_from_slice(bytes);
}
