use std::process::Command;

/// Trimmed stdout of a command, or `None` if it failed or printed nothing.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Release builds pass the values in; local builds ask git and date.
fn stamp(var: &str, program: &str, args: &[&str]) -> String {
    println!("cargo:rerun-if-env-changed={}", var);
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| command_output(program, args))
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let git_sha = stamp("GIT_SHA", "git", &["rev-parse", "--short", "HEAD"]);
    let build_date = stamp("BUILD_DATE", "date", &["-u", "+%Y-%m-%d"]);

    println!("cargo:rustc-env=GIT_SHA={}", git_sha);
    println!("cargo:rustc-env=BUILD_DATE={}", build_date);
    println!("cargo:rerun-if-changed=build.rs");
}
