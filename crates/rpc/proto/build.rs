//! Build script for rumor-rpc-proto.
//!
//! Compiles the discovery protocol definition into `src/` together with the
//! encoded descriptor set served through reflection. Both outputs are checked
//! in, so this only runs with the `codegen` feature.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "codegen")]
    {
        let proto_root = std::path::Path::new("proto");
        let proto_file = proto_root.join("rumor/discovery/v1/discovery.proto");

        println!("cargo:rerun-if-changed={}", proto_file.display());

        tonic_build::configure()
            .out_dir("src/")
            .file_descriptor_set_path("src/discovery_descriptor.bin")
            .compile_protos(&[proto_file], &[proto_root])?;
    }

    Ok(())
}
