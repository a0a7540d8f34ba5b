use std::env;

fn main() {
    // Flash window configuration, overridable at build time.
    // Values are parsed by `config.rs`; they only take effect on a blank or
    // re-laid-out device since they change the region geometry.

    // Requested parameter region size in bytes (rounded up to page/sector)
    if let Ok(size) = env::var("FLASHPARAM_REQ_SIZE") {
        println!("cargo:rustc-env=FLASHPARAM_REQ_SIZE={}", size);
        println!(
            "cargo:warning=Using FLASHPARAM_REQ_SIZE from environment: {}",
            size
        );
    } else {
        println!("cargo:rustc-env=FLASHPARAM_REQ_SIZE=1024");
    }

    // Bounded wait for the multicore lockout before erase/program
    if let Ok(timeout) = env::var("FLASHPARAM_COMMIT_TIMEOUT_MS") {
        println!("cargo:rustc-env=FLASHPARAM_COMMIT_TIMEOUT_MS={}", timeout);
        println!(
            "cargo:warning=Using FLASHPARAM_COMMIT_TIMEOUT_MS from environment: {}",
            timeout
        );
    } else {
        println!("cargo:rustc-env=FLASHPARAM_COMMIT_TIMEOUT_MS=100");
    }

    // Rerun if environment variables change
    println!("cargo:rerun-if-env-changed=FLASHPARAM_REQ_SIZE");
    println!("cargo:rerun-if-env-changed=FLASHPARAM_COMMIT_TIMEOUT_MS");
}
