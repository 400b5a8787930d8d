//! The `relayer` CLI surface (spec 6): `add-mnemonic`, `add-gas-price`,
//! `add-path`, `relay`, `dump-paths`.

use std::io::BufRead;

use clap::{Parser, Subcommand};
use relayer_primitives::{
    error::Error,
    relay_path::{ChainType, IbcVersion},
};

#[derive(Parser)]
#[command(name = "relayer", about = "Bidirectional IBC relay engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store mnemonic for chain `C`. Accepted via `--mnemonic`, the `MNEMONIC`
    /// env var, or stdin -- never a bare positional, so it never shows up in
    /// a process listing.
    AddMnemonic {
        #[arg(long)]
        chain_id: String,
        #[arg(long)]
        mnemonic: Option<String>,
    },
    /// Store gas price per chain, e.g. `0.025uatom`.
    AddGasPrice {
        #[arg(long)]
        chain_id: String,
        price: String,
    },
    /// Persist a relay path.
    AddPath {
        #[arg(long)]
        source: String,
        #[arg(long)]
        source_url: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        destination_url: String,
        #[arg(long, value_parser = parse_chain_type)]
        source_type: ChainType,
        #[arg(long, value_parser = parse_chain_type)]
        destination_type: ChainType,
        #[arg(long, value_parser = parse_ibc_version)]
        ibc_version: IbcVersion,
        /// Pre-existing client id tracking the destination, if one already
        /// exists. Left unset, `init()` creates one on first run.
        #[arg(long)]
        client_a: Option<String>,
        #[arg(long)]
        client_b: Option<String>,
    },
    /// Run the relay loop until signalled.
    Relay,
    /// Print all paths as JSON to stdout.
    DumpPaths,
}

fn parse_chain_type(raw: &str) -> Result<ChainType, String> {
    match raw {
        "cosmos" => Ok(ChainType::Cosmos),
        "gno" => Ok(ChainType::Gno),
        other => Err(format!("unknown chain type {other:?}, expected cosmos|gno")),
    }
}

fn parse_ibc_version(raw: &str) -> Result<IbcVersion, String> {
    match raw {
        "1" => Ok(IbcVersion::V1),
        "2" => Ok(IbcVersion::V2),
        other => Err(format!("unknown ibc version {other:?}, expected 1|2")),
    }
}

/// Resolves the mnemonic input precedence: `--mnemonic` flag, then `MNEMONIC`
/// env var, then stdin (spec 6).
pub fn resolve_mnemonic(flag: Option<String>) -> Result<String, Error> {
    if let Some(value) = flag {
        return Ok(value);
    }
    if let Ok(value) = std::env::var("MNEMONIC") {
        return Ok(value);
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Error::Config(format!("failed to read mnemonic from stdin: {e}")))?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("no mnemonic supplied via --mnemonic, MNEMONIC, or stdin".into()));
    }
    Ok(trimmed.to_string())
}

/// Parses `"0.025uatom"` into `(0.025, "uatom")` (spec 6 `add-gas-price`).
pub fn parse_gas_price(raw: &str) -> Result<(f64, String), Error> {
    let split_at = raw.find(|c: char| !c.is_ascii_digit() && c != '.').ok_or_else(|| {
        Error::Config(format!("gas price {raw:?} has no denom suffix, expected e.g. \"0.025uatom\""))
    })?;
    let (amount, denom) = raw.split_at(split_at);
    if denom.is_empty() {
        return Err(Error::Config(format!("gas price {raw:?} has no denom suffix, expected e.g. \"0.025uatom\"")));
    }
    let amount: f64 = amount
        .parse()
        .map_err(|e| Error::Config(format!("gas price {amount:?} is not a valid number: {e}")))?;
    Ok((amount, denom.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gas_price_with_denom() {
        assert_eq!(parse_gas_price("0.025uatom").unwrap(), (0.025, "uatom".to_string()));
    }

    #[test]
    fn rejects_gas_price_without_denom() {
        assert!(parse_gas_price("0.025").is_err());
    }

    #[test]
    fn mnemonic_flag_takes_precedence_over_env() {
        std::env::set_var("MNEMONIC", "env value");
        let resolved = resolve_mnemonic(Some("flag value".to_string())).unwrap();
        assert_eq!(resolved, "flag value");
        std::env::remove_var("MNEMONIC");
    }
}
