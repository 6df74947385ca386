use std::process::Command;

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let vars = [
        ("PJ_GIT_COMMIT", run("git", &["rev-parse", "--short", "HEAD"])),
        ("PJ_GIT_BRANCH", run("git", &["rev-parse", "--abbrev-ref", "HEAD"])),
        (
            "PJ_BUILD_TIMESTAMP",
            // reproducible builds pin the clock
            match std::env::var("SOURCE_DATE_EPOCH") {
                Ok(epoch) => run("date", &["-u", "-d", &format!("@{epoch}"), "+%Y-%m-%dT%H:%M:%SZ"]),
                Err(_) => run("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]),
            },
        ),
    ];

    for (name, value) in vars {
        if let Some(value) = value {
            println!("cargo:rustc-env={name}={value}");
        }
    }
}
