//! Receive a capture stream and drive a small skeleton
//!
//! Usage: `cargo run --example listen [config.toml]`
//!
//! Logs the character position about once a second. Pair with the
//! `send_test_stream` example to run without a capture application.

use glam::{Quat, Vec3};
use mocap_stream::{
    JointHierarchy, JointId, ListenerConfig, MocapListener, Retargeter, Skeleton,
};
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

fn build_rig() -> (Skeleton, JointId) {
    let mut s = Skeleton::new();
    let character = s.add_root("Character", Vec3::ZERO, Quat::IDENTITY);
    let hips = s.add_joint(character, "Hips", Vec3::new(0.0, 0.95, 0.0), Quat::IDENTITY);
    let spine = s.add_joint(hips, "Spine", Vec3::new(0.0, 0.1, 0.0), Quat::IDENTITY);
    let chest = s.add_joint(spine, "Spine1", Vec3::new(0.0, 0.15, 0.0), Quat::IDENTITY);
    let neck = s.add_joint(chest, "Neck", Vec3::new(0.0, 0.2, 0.0), Quat::IDENTITY);
    s.add_joint(neck, "Head", Vec3::new(0.0, 0.1, 0.0), Quat::IDENTITY);
    for side in ["Left", "Right"] {
        let sign = if side == "Left" { 1.0 } else { -1.0 };
        let hip_offset = Vec3::new(0.1 * sign, -0.05, 0.0);
        let shin = Vec3::new(0.0, -0.42, 0.0);
        let up = s.add_joint(hips, format!("{side}UpLeg"), hip_offset, Quat::IDENTITY);
        let leg = s.add_joint(up, format!("{side}Leg"), shin, Quat::IDENTITY);
        s.add_joint(leg, format!("{side}Foot"), shin, Quat::IDENTITY);
    }
    (s, character)
}

fn main() -> mocap_stream::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Using config: {}", path);
            ListenerConfig::from_file(path)?
        }
        None => ListenerConfig::default(),
    };

    let listener = MocapListener::start(&config)?;
    log::info!("Listening on {}", listener.local_addr());

    let (mut skeleton, character) = build_rig();
    let mut retargeter = Retargeter::new();
    let mut last_report = Instant::now();
    let mut applied = 0u64;

    loop {
        if retargeter.tick(&listener, &mut skeleton, character) {
            applied += 1;
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            let stats = listener.stats();
            log::info!(
                "Character at {:?} | applied {} | received {} poses, {} dropped",
                skeleton.local_position(character),
                applied,
                stats.poses,
                stats.dropped
            );
            last_report = Instant::now();
        }

        std::thread::sleep(FRAME);
    }
}
