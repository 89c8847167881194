//! Binary integration tests.
//!
//! Most tests replay pcap files and need no privileges. Live capture tests
//! require root and are skipped otherwise.
//! Run with: `sudo cargo test --test cli_integration`

use std::io::Write;
use std::process::{Command, Output};
use std::time::Duration;

fn capstat_bin() -> &'static str {
    env!("CARGO_BIN_EXE_capstat")
}

fn is_root() -> bool {
    unsafe { libc::getuid() == 0 }
}

/// Skip test if not running as root.
macro_rules! require_root {
    () => {
        if !is_root() {
            eprintln!("SKIPPED: requires root");
            return;
        }
    };
}

fn run(args: &[&str]) -> Output {
    Command::new(capstat_bin())
        .args(args)
        .output()
        .expect("failed to execute capstat")
}

fn ipv4_frame(proto: u8, src: [u8; 4], dst: [u8; 4]) -> Vec<u8> {
    let mut pkt = Vec::new();
    pkt.extend_from_slice(&[0xff; 6]);
    pkt.extend_from_slice(&[0x02, 0, 0, 0, 0, 1]);
    pkt.extend_from_slice(&0x0800u16.to_be_bytes());
    pkt.extend_from_slice(&[0x45, 0, 0, 20, 0, 0, 0, 0, 64, proto, 0, 0]);
    pkt.extend_from_slice(&src);
    pkt.extend_from_slice(&dst);
    pkt
}

/// Classic little-endian pcap file with microsecond timestamps.
fn write_pcap(linktype: u32, frames: &[Vec<u8>]) -> tempfile::NamedTempFile {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&65535u32.to_le_bytes());
    bytes.extend_from_slice(&linktype.to_le_bytes());
    for (i, frame) in frames.iter().enumerate() {
        bytes.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(frame);
    }
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();
    file
}

fn mixed_frames(n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| {
            let proto = [6u8, 17, 1][i % 3];
            ipv4_frame(proto, [192, 168, 1, 10], [192, 168, 1, 20])
        })
        .collect()
}

// =========================================================================
// Usage errors
// =========================================================================

#[test]
fn no_arguments_exits_with_usage_error() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
    assert!(output.stdout.is_empty());
}

#[test]
fn two_interfaces_exit_with_usage_error() {
    let output = run(&["eth0", "eth1"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn zero_interval_exits_with_usage_error() {
    let output = run(&["--sample-every", "0", "lo"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn help_exits_zero() {
    let output = run(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--sample-every"));
    assert!(stdout.contains("--read"));
}

// =========================================================================
// Open failures
// =========================================================================

#[test]
fn missing_pcap_file_is_an_open_failure() {
    let output = run(&["--read", "/nonexistent/capstat-test.pcap"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn non_ethernet_pcap_is_rejected() {
    // LINKTYPE_RAW
    let file = write_pcap(101, &[vec![0x45; 20]]);
    let output = run(&["--read", file.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported link type"));
}

#[test]
fn unknown_interface_is_an_open_failure() {
    let output = run(&["capstat-no-such-if0"]);
    assert_eq!(output.status.code(), Some(2));
}

// =========================================================================
// File replay
// =========================================================================

#[test]
fn replay_prints_samples_and_statistics() {
    let file = write_pcap(1, &mixed_frames(12));
    let output = run(&[
        "--read",
        file.path().to_str().unwrap(),
        "--sample-every",
        "3",
        "--summary-every",
        "6",
    ]);

    assert!(
        output.status.success(),
        "exit code: {}, stderr: {}",
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("Packet #").count(), 4);
    assert!(stdout.contains("Packet #3: 192.168.1.10 -> 192.168.1.20, ICMP, size=34 bytes"));
    assert!(stdout.contains("Packet #6: 192.168.1.10 -> 192.168.1.20, ICMP, size=34 bytes"));
    // Two summaries and the final block.
    assert_eq!(stdout.matches("=== Statistics ===").count(), 3);
    assert!(stdout.contains("Packets received: 6\n"));
    assert!(stdout.contains("Bytes received: 408\n"));
    assert!(stdout.ends_with("Packets dropped: 0\n==================\n"));
}

#[test]
fn replay_json_lines() {
    let file = write_pcap(1, &mixed_frames(5));
    let output = run(&[
        "--read",
        file.path().to_str().unwrap(),
        "--sample-every",
        "2",
        "--format",
        "json",
    ]);
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is a JSON object"))
        .collect();
    assert_eq!(lines.len(), 3);

    assert_eq!(lines[0]["kind"], "sample");
    assert_eq!(lines[0]["packet_number"], 2);
    assert_eq!(lines[0]["classification"]["protocol"], "udp");
    assert_eq!(lines[0]["classification"]["src"], "192.168.1.10");
    assert_eq!(lines[0]["timestamp_us"], 1_700_000_001_000_000u64);

    assert_eq!(lines[2]["kind"], "final");
    assert_eq!(lines[2]["packets"], 5);
    assert_eq!(lines[2]["bytes"], 5 * 34);
}

#[test]
fn empty_pcap_still_prints_final_report() {
    let file = write_pcap(1, &[]);
    let output = run(&["--read", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Packets received: 0\n"));
    assert!(!stdout.contains("Packet #"));
}

// =========================================================================
// Live capture (root only)
// =========================================================================

#[test]
fn live_capture_stops_on_sigterm() {
    require_root!();

    let child = Command::new(capstat_bin())
        .args(["lo", "--poll-timeout-ms", "50"])
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .expect("failed to spawn capstat");

    std::thread::sleep(Duration::from_millis(500));
    unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };

    let output = child.wait_with_output().expect("failed to wait");
    assert!(
        output.status.success(),
        "exit code: {}, stderr: {}",
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Statistics ==="));
    assert!(stdout.contains("Packets dropped:"));
}
