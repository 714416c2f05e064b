//! Stream a synthetic walk cycle to a listener
//!
//! Usage: `cargo run --example send_test_stream [host:port]`
//!
//! Sends a names packet once a second and poses at 60 Hz, the way the
//! capture application does.

use glam::{Quat, Vec3};
use mocap_stream::Pose;
use mocap_stream::config::DEFAULT_PORT;
use mocap_stream::protocol::writer::{encode_names, encode_pose};
use std::f32::consts::TAU;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

const JOINTS: [&str; 6] = ["Hips", "Spine", "LeftUpLeg", "LeftLeg", "RightUpLeg", "RightLeg"];

fn walk(t: f32) -> Pose {
    let phase = t * TAU;
    let swing = phase.sin() * 0.5;
    let knee = swing.abs() * 0.6;
    let bob = 0.02 * (2.0 * phase).cos();
    Pose {
        root_name: Some(JOINTS[0].to_string()),
        root_position: Vec3::new(0.0, 0.95 + bob, t * 1.2),
        rotations: vec![
            (JOINTS[0].into(), Quat::from_rotation_y(swing * 0.1)),
            (JOINTS[1].into(), Quat::from_rotation_y(-swing * 0.1)),
            (JOINTS[2].into(), Quat::from_rotation_x(swing)),
            (JOINTS[3].into(), Quat::from_rotation_x(knee)),
            (JOINTS[4].into(), Quat::from_rotation_x(-swing)),
            (JOINTS[5].into(), Quat::from_rotation_x(knee)),
        ],
    }
}

fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("127.0.0.1:{}", DEFAULT_PORT));
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    log::info!("Streaming walk cycle to {}", target);

    let names = encode_names(&JOINTS);
    let start = Instant::now();
    let mut last_names: Option<Instant> = None;

    loop {
        if last_names.is_none_or(|t| t.elapsed() >= Duration::from_secs(1)) {
            socket.send_to(&names, &target)?;
            last_names = Some(Instant::now());
        }

        let pose = walk(start.elapsed().as_secs_f32());
        if let Err(e) = socket.send_to(&encode_pose(&pose), &target) {
            // Fire-and-forget: nobody listening is not fatal
            log::warn!("Send failed: {}", e);
        }
        std::thread::sleep(Duration::from_millis(16));
    }
}
