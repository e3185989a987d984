//! Build script: compiles protobuf definitions.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("PROTOC").is_err() {
        unsafe {
            std::env::set_var(
                "PROTOC",
                protoc_bin_vendored::protoc_bin_path()
                    .expect("protoc binary not found in vendored crate"),
            );
        }
    }
    println!("cargo:rerun-if-changed=proto/gateway.proto");
    tonic_prost_build::compile_protos("proto/gateway.proto")?;
    Ok(())
}
