// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ajbus-sig - inspect bus type signatures and interface contracts.

use ajbus::contract::{InterfaceSet, MemberContract};
use ajbus::{ContractDescriptor, EngineConfig, SigType, Signature, TypeSignatureCalculator};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ajbus-sig")]
#[command(about = "Validate bus type signatures and derive interface contracts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (TOML) with signature limits
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate signatures and print their structure
    Check {
        /// Signatures to check
        #[arg(value_name = "SIG", required = true)]
        signatures: Vec<String>,
    },

    /// Derive contracts from a TOML interface definition file
    Contract {
        /// Interface definition file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write an example engine configuration
    GenConfig {
        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    log::info!(
        "limits: len {} struct depth {} array depth {}",
        config.max_signature_len,
        config.max_struct_depth,
        config.max_array_depth
    );

    match cli.command {
        Commands::Check { signatures } => cmd_check(&config, &signatures),
        Commands::Contract { input, json } => cmd_contract(&config, &input, json),
        Commands::GenConfig { output } => cmd_gen_config(output.as_deref()),
    }
}

fn cmd_check(config: &EngineConfig, signatures: &[String]) -> anyhow::Result<()> {
    let limits = config.limits();
    for text in signatures {
        let sig = Signature::parse_with(text, &limits)
            .with_context(|| format!("invalid signature '{}'", text))?;

        println!("'{}': {} complete type(s)", sig, sig.len());
        for ty in sig.types() {
            let (structs, arrays) = ty.depth();
            let mut tree = String::new();
            explain(ty, 1, &mut tree);
            print!("{}", tree);
            println!("  depth: {} struct, {} array", structs, arrays);
        }
        let parts: Vec<String> = sig.split().iter().map(ToString::to_string).collect();
        println!("  split: [{}]", parts.join(", "));
    }
    Ok(())
}

fn explain(ty: &SigType, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    match ty {
        SigType::Scalar(tag) => {
            let _ = writeln!(out, "{}{} {:?}", pad, tag, tag);
        }
        SigType::Variant => {
            let _ = writeln!(out, "{}v Variant", pad);
        }
        SigType::Array(element) => {
            let _ = writeln!(out, "{}a Array of '{}'", pad, element);
            explain(element, indent + 1, out);
        }
        SigType::Struct(members) => {
            let _ = writeln!(out, "{}( Struct, {} members", pad, members.len());
            for member in members {
                explain(member, indent + 1, out);
            }
        }
        SigType::DictEntry(key, value) => {
            let _ = writeln!(out, "{}{{ DictEntry", pad);
            explain(&SigType::Scalar(*key), indent + 1, out);
            explain(value, indent + 1, out);
        }
    }
}

/// JSON shape of one member contract.
#[derive(Serialize)]
struct ContractRow<'a> {
    interface: &'a str,
    name: &'a str,
    kind: &'static str,
    input: &'a str,
    output: &'a str,
    access: String,
    flags: Vec<&'static str>,
    arg_names: &'a [String],
    annotations: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_perm: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> From<&'a MemberContract> for ContractRow<'a> {
    fn from(m: &'a MemberContract) -> Self {
        Self {
            interface: &m.interface,
            name: &m.name,
            kind: m.kind.as_str(),
            input: m.input_signature.as_str(),
            output: m.output_signature.as_str(),
            access: m.access.to_string(),
            flags: m.flags.names(),
            arg_names: &m.arg_names,
            annotations: &m.annotations,
            access_perm: m.access_perm.as_deref(),
            timeout_ms: m.timeout_ms,
            description: m.description.as_deref(),
        }
    }
}

fn cmd_contract(config: &EngineConfig, input: &Path, json: bool) -> anyhow::Result<()> {
    let limits = config.limits();
    let set = InterfaceSet::from_file(input)
        .with_context(|| format!("reading interfaces from {}", input.display()))?;
    let decls = set.to_decls(&limits)?;
    let contracts = ContractDescriptor::new(TypeSignatureCalculator::new(limits)).describe_all(&decls)?;

    if json {
        let rows: Vec<ContractRow<'_>> = contracts
            .iter()
            .flat_map(|iface| iface.members.iter().map(ContractRow::from))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for iface in &contracts {
        println!(
            "{} (secure: {}, announced: {})",
            iface.name,
            iface.secure.as_str(),
            iface.announced
        );
        println!("  {:<9} {:<24} {:<16} {:<16} {}", "KIND", "NAME", "IN", "OUT", "ACCESS");
        for m in &iface.members {
            println!(
                "  {:<9} {:<24} {:<16} {:<16} {}",
                m.kind,
                m.name,
                display_sig(&m.input_signature),
                display_sig(&m.output_signature),
                m.access
            );
        }
    }
    Ok(())
}

fn display_sig(sig: &Signature) -> String {
    if sig.is_empty() {
        "-".to_string()
    } else {
        sig.to_string()
    }
}

fn cmd_gen_config(output: Option<&Path>) -> anyhow::Result<()> {
    let text = EngineConfig::default().to_toml()?;
    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
