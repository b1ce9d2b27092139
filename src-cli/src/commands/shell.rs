//! Interactive shell: one password, many commands.
//!
//! Lines are `add LABEL`, `get LABEL`, `forget LABEL`, `decoys N`, `help`,
//! and `exit`. `add` reads data lines until a line holding a single `.`.
//! A failing command is reported and the shell keeps going.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use latebra_store::{Backend, EntryStore, Session};
use zeroize::Zeroizing;

use super::entries;
use crate::prompt::append_wiping;

const LINE_CAPACITY: usize = 4096;

const HELP: &str = "\
commands:
  add LABEL       store a new entry (data follows, end with a line holding '.')
  get LABEL       print an entry
  forget LABEL    delete an entry
  decoys N        insert N decoy chunks
  help            show this text
  exit            leave the shell";

/// One parsed shell line.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand<'a> {
    Add(&'a str),
    Get(&'a str),
    Forget(&'a str),
    Decoys(usize),
    Help,
    Exit,
    Empty,
}

fn parse(line: &str) -> Result<ShellCommand<'_>> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    let label = || {
        if rest.is_empty() {
            bail!("{verb}: missing label");
        }
        Ok(rest)
    };

    Ok(match verb {
        "" => ShellCommand::Empty,
        "add" | "import" => ShellCommand::Add(label()?),
        "get" | "export" | "peak" | "peek" => ShellCommand::Get(label()?),
        "forget" | "remove" => ShellCommand::Forget(label()?),
        "decoys" => ShellCommand::Decoys(
            rest.parse()
                .with_context(|| format!("decoys: invalid count {rest:?}"))?,
        ),
        "help" | "?" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => bail!("unknown command {other:?}; type 'help'"),
    })
}

/// Read data lines until a lone `.` or end of input.
fn read_block<R: BufRead>(input: &mut R) -> Result<Zeroizing<Vec<u8>>> {
    let mut data = Zeroizing::new(Vec::new());
    let mut line = Zeroizing::new(String::with_capacity(LINE_CAPACITY));
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        if line.trim_end_matches(['\r', '\n']) == "." {
            break;
        }
        append_wiping(&mut data, line.as_bytes());
    }
    // The final newline belongs to the terminator line.
    if data.last() == Some(&b'\n') {
        data.pop();
    }
    Ok(data)
}

/// Run the shell until `exit` or end of input.
///
/// # Errors
///
/// Returns an error only if reading `input` or writing `out` fails.
pub fn run<B: Backend, R: BufRead, W: Write>(
    store: &EntryStore<B>,
    session: &Session,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "latebra shell; type 'help' for commands.")?;
    let mut line = Zeroizing::new(String::with_capacity(LINE_CAPACITY));
    loop {
        write!(out, "latebra> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }

        let result = match parse(&line) {
            Ok(ShellCommand::Exit) => return Ok(()),
            Ok(ShellCommand::Empty) => Ok(()),
            Ok(ShellCommand::Help) => writeln!(out, "{HELP}").map_err(Into::into),
            Ok(ShellCommand::Add(label)) => {
                writeln!(out, "enter data, end with a line holding '.':")?;
                read_block(input).and_then(|data| entries::add(store, session, label, &data))
            }
            Ok(ShellCommand::Get(label)) => entries::get(store, session, label, None, out),
            Ok(ShellCommand::Forget(label)) => entries::forget(store, session, label),
            Ok(ShellCommand::Decoys(count)) => entries::decoys(store, count),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            writeln!(out, "[!] {e:#}")?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latebra_crypto_core::kdf::CostParameters;
    use latebra_crypto_core::memory::WipeRegistry;
    use latebra_store::MemoryBackend;
    use std::io::Cursor;

    const TEST_COST: CostParameters = CostParameters { n: 4, r: 1, p: 1 };

    fn run_script(script: &str) -> (String, EntryStore<MemoryBackend>) {
        let registry = WipeRegistry::new();
        let store = EntryStore::new(MemoryBackend::new(), registry.clone(), 64).unwrap();
        let session = Session::new(&registry, b"pw", TEST_COST).unwrap();
        let mut out = Vec::new();
        run(&store, &session, &mut Cursor::new(script), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), store)
    }

    #[test]
    fn parse_verbs_and_aliases() {
        assert_eq!(parse("add  my label ").unwrap(), ShellCommand::Add("my label"));
        assert_eq!(parse("peek x").unwrap(), ShellCommand::Get("x"));
        assert_eq!(parse("peak x").unwrap(), ShellCommand::Get("x"));
        assert_eq!(parse("remove x").unwrap(), ShellCommand::Forget("x"));
        assert_eq!(parse("decoys 4").unwrap(), ShellCommand::Decoys(4));
        assert_eq!(parse("   ").unwrap(), ShellCommand::Empty);
        assert_eq!(parse("quit").unwrap(), ShellCommand::Exit);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse("get").is_err());
        assert!(parse("decoys many").is_err());
        assert!(parse("launch").is_err());
    }

    #[test]
    fn read_block_stops_at_dot() {
        let data = read_block(&mut Cursor::new("line one\nline two\n.\nafter\n")).unwrap();
        assert_eq!(data.as_slice(), b"line one\nline two");
    }

    #[test]
    fn read_block_keeps_long_input() {
        let line = "x".repeat(LINE_CAPACITY + 1);
        let script = format!("{line}\n{line}\n.\n");
        let data = read_block(&mut Cursor::new(script)).unwrap();
        assert_eq!(data.len(), 2 * line.len() + 1);
    }

    #[test]
    fn add_then_get_in_one_session() {
        let (out, _) = run_script("add note\nsecret text\n.\nget note\nexit\n");
        assert!(out.contains("-----BEGIN PLAINTEXT-----\nsecret text\n-----END PLAINTEXT-----"));
    }

    #[test]
    fn errors_do_not_end_the_shell() {
        let (out, store) = run_script("get missing\nbogus\ndecoys 2\n");
        assert!(out.contains("[!] no entry found"));
        assert!(out.contains("[!] unknown command"));
        assert_eq!(store.backend().len().unwrap(), 2);
    }
}
