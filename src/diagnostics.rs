//! System diagnostics and dependency checking.
//!
//! Verifies the external tools and services a worker needs before it takes
//! its first job: the audio codec, the speech engine, the broker, the voice
//! model files, and the jingle clip.

use crate::config::Config;
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// Check if a command exists and is executable.
fn check_command(command: &str) -> CheckResult {
    match Command::new(command).arg("--version").output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but --version failed", command)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Check broker reachability with a round trip.
fn check_broker(url: &str) -> CheckResult {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(e) => return CheckResult::Warning(format!("invalid broker url: {e}")),
    };
    match client.get_connection() {
        Ok(mut conn) => match redis::cmd("PING").query::<String>(&mut conn) {
            Ok(_) => CheckResult::Ok,
            Err(e) => CheckResult::Warning(format!("connected but PING failed: {e}")),
        },
        Err(_) => CheckResult::NotFound,
    }
}

fn print_result(label: &str, result: &CheckResult) {
    print!("{label}: ");
    match result {
        CheckResult::Ok => println!("✓ OK"),
        CheckResult::NotFound => println!("✗ NOT FOUND"),
        CheckResult::Warning(msg) => println!("⚠ WARNING: {msg}"),
    }
}

/// Run all dependency checks and print results.
pub fn check_dependencies(config: &Config) {
    println!("Checking articast dependencies...\n");

    let ffmpeg = check_command("ffmpeg");
    print_result("ffmpeg (audio encode/decode)", &ffmpeg);
    if ffmpeg == CheckResult::NotFound {
        println!("  Install: sudo apt install ffmpeg  (Debian/Ubuntu)");
        println!("           sudo pacman -S ffmpeg    (Arch)");
    }

    let piper = check_command(&config.tts.piper_bin);
    print_result(
        &format!("{} (speech engine)", config.tts.piper_bin),
        &piper,
    );
    if piper == CheckResult::NotFound {
        println!("  Install piper and point tts.piper_bin at the binary.");
    }

    let broker = check_broker(&config.broker.url);
    print_result(&format!("broker at {}", config.broker.url), &broker);
    if broker == CheckResult::NotFound {
        println!("  Start the broker or set broker.url / ARTICAST_BROKER_URL.");
    }

    println!();
    println!("Voice models:");
    let mut models_ok = true;
    for (voice, path) in &config.tts.voices {
        print!("  {voice} ({}): ", path.display());
        if path.exists() {
            println!("✓ OK");
        } else {
            println!("✗ missing");
            models_ok = false;
        }
    }

    print!("Jingle ({}): ", config.files.jingle.display());
    let jingle_ok = config.files.jingle.exists();
    if jingle_ok {
        println!("✓ OK");
    } else {
        println!("✗ missing");
    }

    println!();
    let ready = ffmpeg == CheckResult::Ok
        && piper == CheckResult::Ok
        && broker == CheckResult::Ok
        && models_ok
        && jingle_ok;
    if ready {
        println!("✓ Ready to run workers.");
    } else {
        println!("⚠ Workers will not start cleanly until the items above are fixed.");
    }
}
