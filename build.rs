// Stamps BUILD_NUMBER (from the file of the same name, default 0) into the
// version string shown by `--version` and the header.
fn main() {
    let build_number = std::fs::read_to_string("BUILD_NUMBER")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "0".to_string());

    println!("cargo:rustc-env=BUILD_NUMBER={build_number}");
    println!("cargo:rerun-if-changed=BUILD_NUMBER");
}
