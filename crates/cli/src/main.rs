// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zmir: diagnostics for the coordination-store mirror.
//!
//! The table subcommands enumerate the constants the mirror exchanges with
//! the store client; with no subcommand a demo mirrors `/` and `/foo` on an
//! in-memory store with a background writer.

mod tables;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use zmir_mirror::Mirror;
use zmir_store::{FakeStore, StoreClient};

#[derive(Parser)]
#[command(name = "zmir", about = "Diagnostics for the coordination-store mirror", version)]
struct Cli {
    /// Verbose engine logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List session states with their codes
    States,
    /// List event kinds with their codes
    Events,
    /// List numeric constants (create flags and permission bits)
    Consts,
    /// List the error taxonomy
    Exceptions,
    /// List the store-client capability set
    Functions,
    /// Mirror `/` and `/foo` on an in-memory store (the default)
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let lines = match cli.command {
        Some(Command::States) => tables::state_lines(),
        Some(Command::Events) => tables::event_lines(),
        Some(Command::Consts) => tables::const_lines(),
        Some(Command::Exceptions) => tables::exception_lines(),
        Some(Command::Functions) => tables::function_lines(),
        Some(Command::Demo) | None => return demo(),
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn init_logging(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Watch `/` and `/foo` forever, printing what the mirror sees while a
/// background writer keeps `/foo` moving.
fn demo() -> Result<()> {
    let store = Arc::new(FakeStore::new());
    let mirror = Mirror::new(Arc::clone(&store) as Arc<dyn StoreClient>);
    mirror.connect(&["localhost"])?;

    // Plays the part of the rest of the cluster.
    {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let mut round = 0u64;
            loop {
                thread::sleep(Duration::from_secs(2));
                round += 1;
                let payload = format!("update-{round}");
                if store.has_node("/foo") {
                    let _ = store.server_set("/foo", payload.as_bytes());
                } else {
                    store.seed("/foo", payload.as_bytes());
                }
            }
        });
    }

    let root = mirror.get("/");
    let foo = mirror.get("/foo");
    root.add_child_watcher(
        Uuid::new_v4().to_string(),
        Arc::new(|update| println!("children of /: {update:?}")),
    );
    foo.add_value_watcher(
        Uuid::new_v4().to_string(),
        Arc::new(|update| match update {
            Some((bytes, meta)) => {
                println!("/foo = {:?} (v{})", String::from_utf8_lossy(&bytes), meta.version);
            }
            None => println!("/foo deleted"),
        }),
    );

    loop {
        match root.value(Duration::from_secs(5)) {
            Ok((bytes, meta)) => {
                println!("/ = {:?} (v{})", String::from_utf8_lossy(&bytes), meta.version);
            }
            Err(err) => println!("/ unreadable: {err}"),
        }
        match root.children(Duration::from_secs(5)) {
            Ok(kids) => println!("/ children: {kids:?}"),
            Err(err) => println!("/ children unreadable: {err}"),
        }
        thread::sleep(Duration::from_secs(5));
    }
}
