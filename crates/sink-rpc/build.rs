//! Build script for compiling the receiver Protocol Buffer definition.
//!
//! The generated code is placed in `$OUT_DIR` and included via `tonic::include_proto!`.

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/receiver.proto");
    println!("cargo:rerun-if-changed=../../proto");
    println!("cargo:rerun-if-env-changed=PROTOC");

    let mut includes = vec![PathBuf::from("../../proto")];

    // Fall back to the bundled protoc (and its well-known types) when none is configured
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
        includes.push(protoc_bin_vendored::include_path()?);
    }

    // Server side for sinks, client side for the agent stand-in and tests
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../../proto/receiver.proto"], &includes)?;

    Ok(())
}
