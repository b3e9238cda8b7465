// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generates `hdds_latch.h` and mirrors the core limits into it.

use hdds_latch::config::{DEFAULT_MAX_SUBSCRIBERS, MAX_CHANNELS, MAX_TOPIC_NAME_LEN};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(e) = try_main() {
        eprintln!("Error generating C bindings: {e}");
        std::process::exit(1);
    }
}

/// `#define`s for limits C callers size their arrays and names with.
fn limit_defines() -> String {
    format!(
        "\n#define PUBSUB_MAX_CHANNELS {MAX_CHANNELS}\
         \n#define PUBSUB_DEFAULT_MAX_SUBSCRIBERS {DEFAULT_MAX_SUBSCRIBERS}\
         \n#define PUBSUB_MAX_TOPIC_NAME_LEN {MAX_TOPIC_NAME_LEN}\n"
    )
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let header = crate_dir.join("hdds_latch.h");
    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml"))?;

    cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .with_after_include(limit_defines())
        .generate()?
        .write_to_file(&header);

    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=cbindgen.toml");
    println!("cargo:rerun-if-changed=../hdds-latch/src/config.rs");

    Ok(())
}
