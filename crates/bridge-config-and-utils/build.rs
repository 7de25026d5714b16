fn main() {
    // Tell cargo to recompile when the compile-time peer identity changes.
    // Without this, the option_env!() value gets cached and won't update.
    println!("cargo:rerun-if-env-changed=WEI_PEER_IDENTITY");
}
